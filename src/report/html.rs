//! Self-contained HTML rendering. All styling is inline; no external resources.

use super::{LineStyle, Report, ReportSection};

const STYLE: &str = "body{font-family:Helvetica,Arial,sans-serif;color:#1f2937;max-width:760px;margin:32px auto;padding:0 16px;line-height:1.5}\
header{text-align:center;border-bottom:2px solid #6366f1;padding-bottom:12px;margin-bottom:24px}\
h1{margin:0;font-size:28px;color:#4f46e5}\
.subtitle{margin:4px 0;font-size:16px}\
.generated{margin:0;font-size:12px;color:#6b7280}\
h2{font-size:18px;border-bottom:1px solid #d1d5db;padding-bottom:4px;margin-top:28px}\
p{margin:6px 0}\
ul{margin:6px 0 6px 8px;padding-left:16px}\
.item{font-weight:600}\
.detail{margin-left:20px;color:#4b5563}\
.disclaimer{font-size:13px;color:#6b7280}";

/// Escape text for HTML element content and attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render `report` as a standalone HTML document.
pub fn generate_html(report: &Report) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!(
        "<title>{} - {}</title>\n",
        html_escape(&report.title),
        html_escape(&report.subtitle)
    ));
    out.push_str(&format!("<style>{STYLE}</style>\n</head>\n<body>\n"));

    out.push_str("<header>\n");
    out.push_str(&format!("<h1>{}</h1>\n", html_escape(&report.title)));
    out.push_str(&format!(
        "<p class=\"subtitle\">{}</p>\n",
        html_escape(&report.subtitle)
    ));
    out.push_str(&format!(
        "<p class=\"generated\">{}</p>\n",
        html_escape(&report.generated_line)
    ));
    out.push_str("</header>\n");

    for section in &report.sections {
        push_section(&mut out, section);
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn push_section(out: &mut String, section: &ReportSection) {
    out.push_str("<section>\n");
    out.push_str(&format!("<h2>{}</h2>\n", html_escape(&section.heading)));

    let mut in_list = false;
    for line in &section.lines {
        if line.style == LineStyle::Bullet {
            if !in_list {
                out.push_str("<ul>\n");
                in_list = true;
            }
            let text = line.text.trim_start_matches('•').trim_start();
            out.push_str(&format!("<li>{}</li>\n", html_escape(text)));
            continue;
        }
        if in_list {
            out.push_str("</ul>\n");
            in_list = false;
        }
        let class = match line.style {
            LineStyle::Item => " class=\"item\"",
            LineStyle::Detail => " class=\"detail\"",
            LineStyle::Paragraph | LineStyle::Bullet => "",
        };
        let class = if section.kind == super::SectionKind::Disclaimer {
            " class=\"disclaimer\""
        } else {
            class
        };
        out.push_str(&format!("<p{class}>{}</p>\n", html_escape(line.text.trim())));
    }
    if in_list {
        out.push_str("</ul>\n");
    }
    out.push_str("</section>\n");
}
