pub mod normalize;
pub mod recordings;

mod error;

pub use error::{Error, Result};
pub use recordings::{RecordingClient, RecordingLookup};

/// Replaces every occurrence of `secret` in `text`.
pub fn redact(text: &str, secret: &str) -> String {
	if secret.is_empty() {
		return text.to_string();
	}

	text.replace(secret, "[REDACTED]")
}
