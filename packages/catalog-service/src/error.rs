pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Configuration error: {message}")]
	Configuration { message: String },
	#[error("Invalid query: {message}")]
	InvalidQuery { message: String },
	#[error("Search unavailable: {message}")]
	SearchUnavailable { message: String },
	#[error("Index write failed: {message}")]
	IndexWriteFailed { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
}
impl From<catalog_config::Error> for Error {
	fn from(err: catalog_config::Error) -> Self {
		Self::Configuration { message: err.to_string() }
	}
}

impl From<catalog_storage::Error> for Error {
	fn from(err: catalog_storage::Error) -> Self {
		match err {
			catalog_storage::Error::InvalidArgument(message) => Self::InvalidQuery { message },
			catalog_storage::Error::Unavailable(message) => Self::Storage { message },
		}
	}
}
