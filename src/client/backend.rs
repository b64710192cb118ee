use async_trait::async_trait;

use super::response::RawResponse;
use crate::errors::HarnessResult;
use crate::prompts::RenderedPrompt;
use crate::session::TurnHandle;

/// A fully prepared turn: continuation state plus rendered prompts.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub turn: TurnHandle,
    pub prompt: RenderedPrompt,
}

/// Abstraction over the generation capability for testability.
/// Real implementation: `XaiBackend`. Test doubles live next to the drivers.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Issue exactly one turn and return the raw response.
    ///
    /// Transport failures are `Operational`; interpreting the payload is the
    /// caller's job.
    async fn sample(&self, request: &TurnRequest) -> HarnessResult<RawResponse>;
}
