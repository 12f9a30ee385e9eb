//! Text provider trait.

use crate::error::Result;
use crate::text::types::{Completion, CompletionRequest, TextProviderKind};
use async_trait::async_trait;

/// Trait for hosted language models.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Runs a single completion round trip.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;

    /// Returns the kind of this provider.
    fn kind(&self) -> TextProviderKind;
}
