pub mod assessment;
pub mod enums;
pub mod message;

pub use assessment::*;
pub use enums::*;
pub use message::*;
