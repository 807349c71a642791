#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Store unavailable: {0}")]
	Unavailable(String),
}
impl Error {
	pub(crate) fn poisoned(what: &str) -> Self {
		Self::Unavailable(format!("{what} lock is poisoned."))
	}
}
