//! Core domain types and utilities shared by the Jupiter crates.
//!
//! Jupiter answers questions about uploaded PDF documents through a
//! tool-calling agent. This crate only carries the pieces every other
//! crate needs: the `Result` alias and the strongly-typed identifiers.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConversationSessionId, DocumentId, MessageId, ParseIdError};
