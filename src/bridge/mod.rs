//! Session bridge core
//!
//! The bridge turns one user message into one durable exchange: it
//! rebuilds the conversation context from persisted history, lets the
//! model answer directly or through a bounded number of tool-call
//! rounds, and reconciles the exchange back into durable storage with a
//! best-effort write.

pub mod conversation;
pub mod metrics;
pub mod turn;

pub use conversation::Conversation;
pub use turn::{Bridge, TurnInput};
