//! SportMate session bridge library
//!
//! This library provides the core functionality for the SportMate
//! session bridge: a small HTTP service that turns one user chat message
//! into one durable exchange, using model reasoning and optionally a web
//! search tool.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `bridge`: The turn pipeline, conversation context, and telemetry
//! - `providers`: Model provider abstraction and the Gemini implementation
//! - `tools`: Tool registry and the web search tool
//! - `backend`: Typed client for the history and profile stores
//! - `prompts`: System instruction and input composition
//! - `server`: Inbound HTTP surface
//! - `config`: Configuration management and validation
//! - `error`: Error types and result alias
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use sportmate::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default_config();
//!     config.validate()?;
//!     sportmate::server::serve(config).await
//! }
//! ```

pub mod backend;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod server;
pub mod tools;

// Re-export commonly used types
pub use backend::BackendClient;
pub use bridge::{Bridge, TurnInput};
pub use config::Config;
pub use error::{Result, SportmateError};
