//! Three-phase retry schedule for recordings that are not available yet.

use serde::{Deserialize, Serialize};
use time::Duration;

/// Highest attempt number that still earns a retry.
pub const MAX_ATTEMPTS: i32 = 12;
pub const EXHAUSTED_ERROR: &str = "max attempts reached";

const QUICK_LAST_ATTEMPT: i32 = 5;
const BACKOFF_LAST_ATTEMPT: i32 = 11;
const QUICK_DELAY_MINUTES: i64 = 2;
const BACKOFF_DELAY_MINUTES: [i64; 6] = [5, 10, 20, 40, 60, 60];
const FINAL_DELAY_MINUTES: i64 = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPhase {
	Quick,
	Backoff,
	Final,
}
impl RetryPhase {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Quick => "quick",
			Self::Backoff => "backoff",
			Self::Final => "final",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"quick" => Some(Self::Quick),
			"backoff" => Some(Self::Backoff),
			"final" => Some(Self::Final),
			_ => None,
		}
	}

	pub fn for_attempt(attempt: i32) -> Self {
		let attempt = attempt.max(1);

		if attempt <= QUICK_LAST_ATTEMPT {
			Self::Quick
		} else if attempt <= BACKOFF_LAST_ATTEMPT {
			Self::Backoff
		} else {
			Self::Final
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
	Retry { delay: Duration, phase: RetryPhase },
	Exhausted,
}

/// Schedule after a failed pass. `attempt` is the job's attempt count including that pass.
///
/// Attempt 0 is treated as 1.
pub fn next_retry(attempt: i32) -> RetryDecision {
	let attempt = attempt.max(1);

	if attempt > MAX_ATTEMPTS {
		return RetryDecision::Exhausted;
	}

	let phase = RetryPhase::for_attempt(attempt);
	let minutes = match phase {
		RetryPhase::Quick => QUICK_DELAY_MINUTES,
		RetryPhase::Backoff => BACKOFF_DELAY_MINUTES[(attempt - QUICK_LAST_ATTEMPT - 1) as usize],
		RetryPhase::Final => FINAL_DELAY_MINUTES,
	};

	RetryDecision::Retry { delay: Duration::minutes(minutes), phase }
}

/// Delay for `attempt`, or `None` once the schedule is exhausted.
pub fn retry_delay(attempt: i32) -> Option<Duration> {
	match next_retry(attempt) {
		RetryDecision::Retry { delay, .. } => Some(delay),
		RetryDecision::Exhausted => None,
	}
}
