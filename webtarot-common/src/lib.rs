//! # webtarot Common Library
//!
//! Shared code for the webtarot client crates including:
//! - Wire models mirroring the backend API (readings, cards, interpretations, users, stats)
//! - Push notification messages exchanged on the notify WebSocket
//! - Configuration loading (TOML bootstrap + environment + compiled defaults)
//! - Key-value store abstraction for locally persisted state
//! - Utility functions

pub mod config;
pub mod error;
pub mod messages;
pub mod model;
pub mod store;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use messages::NotificationMessage;
pub use model::InterpretationResult;
