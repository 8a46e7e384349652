pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<callmatch_storage::Error> for Error {
	fn from(err: callmatch_storage::Error) -> Self {
		match err {
			callmatch_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			callmatch_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			callmatch_storage::Error::SerdeJson(inner) =>
				Self::Storage { message: inner.to_string() },
		}
	}
}
impl From<callmatch_providers::Error> for Error {
	fn from(err: callmatch_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
