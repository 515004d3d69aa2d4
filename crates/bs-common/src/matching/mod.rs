pub mod daily;
pub mod factors;
pub mod interests;
pub mod lifestyle;
pub mod personality;
pub mod pipeline;
pub mod reasons;
pub mod scoring;
pub mod weights;

pub use pipeline::{MatchingEngine, RankedCandidate, RankingCriteria, RankingOutcome};
pub use scoring::{CompatibilityEngine, CompatibilityScore, MatchingConfig, ScoreBreakdown};
