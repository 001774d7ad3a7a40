//! Business services layer.
//!
//! Services orchestrate the engine's components around the persistent
//! store:
//!
//! ```text
//! CLI / reviewer collaborator
//!          |
//!          v
//!    Services layer   <-- you are here
//!          |
//!          v
//! Providers, extraction, scoring, storage
//! ```
//!
//! - [`EffectivenessStore`]: the durable record of senders, attempts, and
//!   post-attempt samples, plus ranking and reporting over it
//! - [`LearningLoop`]: one batch (or daily) run end to end

mod effectiveness;
mod learning;

pub use effectiveness::{
    EffectivenessEntry, EffectivenessStore, EffectivenessTier, RankedCandidate, Statistics,
    StoreError, StoreResult,
};
pub use learning::{
    Candidate, CandidateReviewer, LearningLoop, LoopError, ManualFollowup, ReviewDecision,
    RunReport,
};
