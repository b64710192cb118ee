//! Stateful generation harness.
//!
//! Drives a multi-phase conversation with a generative model: plan, narration,
//! scene build, scene QC and scene repair all continue one conversation per
//! project. Every turn is checked against its phase schema and business rules
//! before the continuation anchor moves.

pub mod audit;
pub mod client;
pub mod config;
pub mod controller;
pub mod drivers;
pub mod errors;
pub mod inject;
pub mod logging;
pub mod phase;
pub mod prompts;
pub mod schemas;
pub mod session;
pub mod state;
pub mod util;
pub mod validate;

pub use errors::{HarnessError, HarnessResult};
pub use phase::Phase;
