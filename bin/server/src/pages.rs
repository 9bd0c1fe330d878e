//! Page components.

pub mod chat;

pub use chat::ChatPage;
