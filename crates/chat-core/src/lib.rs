pub mod frame;
pub mod parser;
pub mod classify;
pub mod session;
pub mod store;
pub mod ports;
pub mod event_bus;
pub mod controller;


pub use session::{CancelHandle, SessionOutcome, SessionState, StreamHandler, start_stream};
pub use store::MessageStore;
