use std::time::Duration;

use thiserror::Error;

use crate::submitter::{TransactionRecord, TxState};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the call pipeline can surface.  Nothing here is retried;
/// the invoking command prints the error and exits non-zero.
#[derive(Debug, Error)]
pub enum Error {
	#[error("malformed type tag `{input}`: {reason}")]
	MalformedTypeTag { input: String, reason: String },

	#[error("profile `{0}` not found in config")]
	ProfileNotFound(String),

	#[error("profile `{profile}` is missing `{field}`")]
	MissingField { profile: String, field: &'static str },

	#[error("config error: {0}")]
	Config(String),

	#[error("signing error: {0}")]
	SigningError(String),

	#[error("invalid argument `{name}`: {reason}")]
	InvalidArgument { name: String, reason: String },

	#[error("`{command}` expects {expected} argument(s), got {got}{}", usage_hint(.command, .usage))]
	ArityMismatch {
		command: String,
		expected: usize,
		got: usize,
		usage: String,
	},

	#[error("unknown command `{0}` (run `move-call list`)")]
	UnknownCommand(String),

	#[error("submission rejected ({status}): {message}")]
	SubmissionRejected {
		status: u16,
		message: String,
		vm_error_code: Option<u64>,
	},

	#[error("transaction {} aborted: {}", .0.hash, .0.vm_status().unwrap_or("unknown"))]
	TransactionFailed(Box<TransactionRecord>),

	#[error("timed out after {waited:?} waiting for {hash}; it may still commit")]
	TimedOut { hash: String, waited: Duration },

	/// The node refused a status poll outright.  Like `TimedOut`, the
	/// transaction's fate is unknown.
	#[error("stopped watching {hash}: {reason}; it may still commit")]
	Unconfirmed { hash: String, reason: String },

	#[error("decode mismatch: {0}")]
	DecodeMismatch(String),

	#[error("illegal lifecycle transition {} -> {to:?}", state_or_start(.from))]
	InvalidTransition { from: Option<TxState>, to: TxState },

	#[error("node returned {status}: {message}")]
	Rpc { status: u16, message: String },

	#[error("transport error: {0}")]
	Transport(String),

	#[error("encode error: {0}")]
	Encode(String),
}

impl Error {
	/// Failures worth polling through: node overload, 5xx, and transport
	/// hiccups.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Rpc { status, .. } => *status >= 500 || *status == 429,
			Self::Transport(_) => true,
			_ => false,
		}
	}

	pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
		Self::MalformedTypeTag {
			input: input.to_owned(),
			reason: reason.into(),
		}
	}
}

impl From<reqwest::Error> for Error {
	fn from(e: reqwest::Error) -> Self {
		Self::Transport(e.to_string())
	}
}

impl From<bcs::Error> for Error {
	fn from(e: bcs::Error) -> Self {
		Self::Encode(e.to_string())
	}
}

fn state_or_start(state: &Option<TxState>) -> String {
	state.map_or_else(|| "start".to_owned(), |s| format!("{s:?}"))
}

fn usage_hint(command: &str, usage: &str) -> String {
	if usage.is_empty() {
		String::new()
	} else {
		format!("; usage: {command} {usage}")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn arity_message_includes_usage_only_when_there_is_one() {
		let with = Error::ArityMismatch {
			command: "lend2:deposit".into(),
			expected: 2,
			got: 1,
			usage: "<TYPE_CoinType> <amount:u64>".into(),
		};
		assert_eq!(
			with.to_string(),
			"`lend2:deposit` expects 2 argument(s), got 1; usage: lend2:deposit <TYPE_CoinType> <amount:u64>"
		);

		let without = Error::ArityMismatch {
			command: "lend2:query-get-all-users".into(),
			expected: 0,
			got: 1,
			usage: String::new(),
		};
		assert_eq!(without.to_string(), "`lend2:query-get-all-users` expects 0 argument(s), got 1");
	}

	#[test]
	fn transition_from_start_names_no_state() {
		let e = Error::InvalidTransition {
			from: None,
			to: TxState::Signed,
		};
		assert_eq!(e.to_string(), "illegal lifecycle transition start -> Signed");
	}

	#[test]
	fn transient_errors() {
		assert!(Error::Rpc { status: 502, message: "bad gateway".into() }.is_transient());
		assert!(Error::Rpc { status: 429, message: "slow down".into() }.is_transient());
		assert!(Error::Transport("reset".into()).is_transient());
		assert!(!Error::Rpc { status: 400, message: "bad".into() }.is_transient());
		assert!(!Error::DecodeMismatch("x".into()).is_transient());
	}
}
