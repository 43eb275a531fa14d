use quarry_domain::QueryError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Invalid query: {0}")]
	Query(#[from] QueryError),
	#[error("Retriever error: {message}")]
	Retriever { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<quarry_storage::Error> for Error {
	fn from(err: quarry_storage::Error) -> Self {
		match err {
			quarry_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			quarry_storage::Error::NotFound(message) => Self::NotFound { message },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

impl From<quarry_providers::Error> for Error {
	fn from(err: quarry_providers::Error) -> Self {
		Self::Retriever { message: err.to_string() }
	}
}
