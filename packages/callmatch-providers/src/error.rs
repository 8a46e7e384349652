pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Provider unavailable: {message}")]
	Unavailable { message: String },
	#[error("Provider rejected credentials: {message}")]
	Auth { message: String },
	#[error("Provider returned no recordings.")]
	EmptyResult,
	#[error("Provider response is invalid: {message}")]
	InvalidResponse { message: String },
}
impl Error {
	/// Empty results are the normal "not ready yet" outcome rather than a fault.
	pub fn is_empty_result(&self) -> bool {
		matches!(self, Self::EmptyResult)
	}
}
impl From<reqwest::Error> for Error {
	fn from(err: reqwest::Error) -> Self {
		// The auth token travels in the query string, so never keep the URL.
		let err = err.without_url();

		if err.is_decode() {
			Self::InvalidResponse { message: err.to_string() }
		} else {
			Self::Unavailable { message: err.to_string() }
		}
	}
}
impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::InvalidResponse { message: err.to_string() }
	}
}
