//! Test Helper Utilities
//!
//! Shared utilities for testing webtarot-client

#![allow(dead_code)]

pub mod mock_backend;
pub mod scripted_source;

pub use mock_backend::{MockBackend, PushStep, RecordedRequest, Reply};
pub use scripted_source::{ScriptedSource, Step};

use std::time::Duration;

/// Wait (real time) until `condition` holds, panicking after two seconds
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Timed out waiting for: {}", what);
}
