use std::{future::Future, time::Duration};

use catalog_config::Retry;

const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Debug)]
pub(crate) enum RetryError {
	/// The store refused the request; retrying cannot help.
	Rejected(String),
	Exhausted { attempts: u32, message: String },
}

pub fn backoff_for_attempt(retry: &Retry, attempt: u32) -> Duration {
	let exp = attempt.max(1).saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
	let base = retry.base_backoff_ms.saturating_mul(1_u64 << exp);

	Duration::from_millis(base.min(retry.max_backoff_ms))
}

/// Runs `op` under `timeout`, retrying transient failures with capped exponential backoff.
pub(crate) async fn run<T, F, Fut>(
	retry: &Retry,
	timeout: Duration,
	operation: &'static str,
	mut op: F,
) -> Result<T, RetryError>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = catalog_storage::Result<T>>,
{
	let max_attempts = retry.max_attempts.max(1);
	let mut attempt = 0_u32;

	loop {
		attempt += 1;

		let message = match tokio::time::timeout(timeout, op()).await {
			Ok(Ok(value)) => return Ok(value),
			Ok(Err(catalog_storage::Error::InvalidArgument(message))) =>
				return Err(RetryError::Rejected(message)),
			Ok(Err(err)) => err.to_string(),
			Err(_) => format!("{operation} timed out after {} ms.", timeout.as_millis()),
		};

		if attempt >= max_attempts {
			return Err(RetryError::Exhausted { attempts: attempt, message });
		}

		let backoff = backoff_for_attempt(retry, attempt);

		tracing::warn!(
			operation,
			attempt,
			backoff_ms = backoff.as_millis() as u64,
			error = %message,
			"Index call failed. Retrying."
		);

		tokio::time::sleep(backoff).await;
	}
}
