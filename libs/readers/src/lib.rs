pub mod error;
pub mod messages;
pub mod reader;

pub use error::ReadError;
pub use messages::{Format, Message, MessagesPage, PageMetadata};
pub use reader::MessageReader;
