//! Structured generation client: the backend seam and the response model.

mod backend;
mod response;
mod xai;

pub use backend::{GenerationBackend, TurnRequest};
pub use response::{
    GenerationResult, RawResponse, ToolInvocation, ToolKind, decode_payload,
};
pub use xai::XaiBackend;
