//! Interpretation Fetcher
//!
//! One retrieval of an interpretation's status and content. The polling driver
//! and the push notifier both go through [`InterpretationSource`], so either
//! can be driven by a scripted source in tests.

use crate::api::ApiClient;
use crate::{ClientError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use webtarot_common::InterpretationResult;

/// Single-shot interpretation lookup
///
/// Implementations perform exactly one retrieval per call, with no retry.
#[async_trait]
pub trait InterpretationSource: Send + Sync {
    async fn fetch(&self, id: &str) -> Result<InterpretationResult>;
}

#[async_trait]
impl InterpretationSource for ApiClient {
    async fn fetch(&self, id: &str) -> Result<InterpretationResult> {
        self.get_interpretation(id).await
    }
}

#[async_trait]
impl<T: InterpretationSource + ?Sized> InterpretationSource for Arc<T> {
    async fn fetch(&self, id: &str) -> Result<InterpretationResult> {
        (**self).fetch(id).await
    }
}

/// Turn the backend's not-found result into `ClientError::NotFound`
pub fn require_found(id: &str, result: InterpretationResult) -> Result<InterpretationResult> {
    if result.is_not_found() {
        Err(ClientError::NotFound(id.to_string()))
    } else {
        Ok(result)
    }
}
