pub mod fingerprint;
pub mod matching;
pub mod recording;
pub mod retry;

pub use matching::{MatchResult, MatchTier, PotentialMatch};
pub use recording::{CallCandidate, RecordingDescriptor};
pub use retry::{RetryDecision, RetryPhase};
