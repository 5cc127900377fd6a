//! Transcript persistence under a fixed storage key.
//!
//! The whole transcript is replaced on every save. Loading reconstructs each
//! message verbatim, timestamps included.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{open_database, open_memory_database, DatabaseError};
use crate::models::{Attachment, Message, Sender};

pub struct TranscriptStore {
    conn: Connection,
}

impl TranscriptStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: open_memory_database()?,
        })
    }

    /// Messages stored under `key`, in transcript order. Empty if none.
    pub fn load(&self, key: &str) -> Result<Vec<Message>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT message_id, sender, text, created_at, attachment_json
             FROM transcript_messages
             WHERE storage_key = ?1
             ORDER BY position",
        )?;

        let rows = stmt.query_map(params![key], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, sender, text, created_at, attachment_json) = row?;
            let id = u64::try_from(id)
                .map_err(|_| DatabaseError::Corrupt(format!("negative message id {id}")))?;
            let created_at = DateTime::parse_from_rfc3339(&created_at)
                .map_err(|e| DatabaseError::Corrupt(format!("timestamp {created_at}: {e}")))?
                .with_timezone(&Utc);

            let message = match Sender::from_str(&sender)? {
                Sender::User => Message::User {
                    id,
                    text,
                    created_at,
                },
                Sender::Assistant => {
                    let attachment = attachment_json
                        .map(|json| serde_json::from_str::<Attachment>(&json))
                        .transpose()
                        .map_err(|e| DatabaseError::Corrupt(e.to_string()))?;
                    Message::Assistant {
                        id,
                        text,
                        created_at,
                        attachment,
                    }
                }
            };
            messages.push(message);
        }
        Ok(messages)
    }

    /// Replace everything stored under `key` with `messages`.
    pub fn save(&mut self, key: &str, messages: &[Message]) -> Result<(), DatabaseError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM transcript_messages WHERE storage_key = ?1",
            params![key],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO transcript_messages
                 (storage_key, position, message_id, sender, text, created_at, attachment_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, message) in messages.iter().enumerate() {
                let attachment_json = message
                    .attachment()
                    .map(serde_json::to_string)
                    .transpose()
                    .map_err(|e| DatabaseError::Corrupt(e.to_string()))?;
                insert.execute(params![
                    key,
                    position as i64,
                    message.id() as i64,
                    message.sender().as_str(),
                    message.text(),
                    message.created_at().to_rfc3339(),
                    attachment_json,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn clear(&self, key: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "DELETE FROM transcript_messages WHERE storage_key = ?1",
            params![key],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TRANSCRIPT_STORAGE_KEY;
    use crate::models::{TurnKind, TurnPayload};

    fn transcript() -> Vec<Message> {
        let payload = TurnPayload {
            message: "How has your sleep been?".into(),
            detected_symptoms: vec!["anxiety".into()],
            conditions: vec![],
            recommendations: vec![],
            confidence: 0.8,
            level: Some(2),
            kind: TurnKind::FollowUp,
            crisis_resources: vec![],
        };
        vec![
            Message::assistant(1, "Hello!", None),
            Message::user(2, "I feel anxious"),
            Message::assistant(3, "How has your sleep been?", Some(Attachment::Turn(payload))),
        ]
    }

    #[test]
    fn save_then_load_is_verbatim() {
        let mut store = TranscriptStore::open_in_memory().unwrap();
        let messages = transcript();
        store.save(TRANSCRIPT_STORAGE_KEY, &messages).unwrap();

        let loaded = store.load(TRANSCRIPT_STORAGE_KEY).unwrap();
        assert_eq!(loaded, messages);
        assert_eq!(loaded[1].created_at(), messages[1].created_at());
    }

    #[test]
    fn save_replaces_previous_contents() {
        let mut store = TranscriptStore::open_in_memory().unwrap();
        store.save(TRANSCRIPT_STORAGE_KEY, &transcript()).unwrap();
        let shorter = vec![Message::assistant(1, "Hello again!", None)];
        store.save(TRANSCRIPT_STORAGE_KEY, &shorter).unwrap();

        assert_eq!(store.load(TRANSCRIPT_STORAGE_KEY).unwrap(), shorter);
    }

    #[test]
    fn keys_are_isolated_and_clear_is_scoped() {
        let mut store = TranscriptStore::open_in_memory().unwrap();
        store.save("a", &transcript()).unwrap();
        store.save("b", &transcript()).unwrap();
        store.clear("a").unwrap();

        assert!(store.load("a").unwrap().is_empty());
        assert_eq!(store.load("b").unwrap().len(), 3);
    }

    #[test]
    fn survives_reopen_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.db");
        let messages = transcript();
        {
            let mut store = TranscriptStore::open(&path).unwrap();
            store.save(TRANSCRIPT_STORAGE_KEY, &messages).unwrap();
        }
        let store = TranscriptStore::open(&path).unwrap();
        assert_eq!(store.load(TRANSCRIPT_STORAGE_KEY).unwrap(), messages);
    }

    #[test]
    fn unknown_sender_is_rejected() {
        let store = TranscriptStore::open_in_memory().unwrap();
        // Bypass the CHECK constraint by recreating the table without it
        store
            .conn
            .execute_batch(
                "DROP TABLE transcript_messages;
                 CREATE TABLE transcript_messages (
                    storage_key TEXT, position INTEGER, message_id INTEGER,
                    sender TEXT, text TEXT, created_at TEXT, attachment_json TEXT);
                 INSERT INTO transcript_messages VALUES
                    ('k', 0, 1, 'bot', 'hi', '2026-01-10T12:00:00+00:00', NULL);",
            )
            .unwrap();
        assert!(matches!(
            store.load("k"),
            Err(DatabaseError::InvalidEnum { .. })
        ));
    }
}
