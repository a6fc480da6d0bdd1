pub mod message;
pub mod event;
pub mod request;
pub mod config;
pub mod error;
pub mod conversation;


pub use error::{ChatError, StreamError};
pub type Result<T> = std::result::Result<T, ChatError>;
