//! Backend store access for the SportMate session bridge
//!
//! This module contains the typed HTTP client for the history and
//! profile stores, plus the wire types they exchange.

pub mod client;
pub mod types;

pub use client::BackendClient;
pub use types::{AppendExchange, ExchangeRecord, Profile};
