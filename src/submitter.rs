use std::time::Duration;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::rpc::{Endpoint, ExecutionOutcome, TransactionStatus};
use crate::signer::Signer;
use crate::tx_builder::{CallPayload, RawTransaction, TransactionPayload};

/// Where a transaction is in its life.  States are only ever entered in
/// the order listed; the last three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
	Built,
	Signed,
	Submitted,
	Pending,
	Confirmed,
	Failed,
	TimedOut,
}

impl TxState {
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Confirmed | Self::Failed | Self::TimedOut)
	}

	fn may_follow(self, prev: Option<TxState>) -> bool {
		use TxState::*;
		matches!(
			(prev, self),
			(None, Built)
				| (Some(Built), Signed)
				| (Some(Signed), Submitted)
				| (Some(Submitted), Pending)
				| (Some(Pending), Confirmed | Failed | TimedOut)
		)
	}
}

/// Guards the state order and remembers every state visited.
#[derive(Debug, Default, Clone)]
pub struct Lifecycle {
	history: Vec<TxState>,
}

impl Lifecycle {
	pub fn state(&self) -> Option<TxState> {
		self.history.last().copied()
	}

	pub fn history(&self) -> &[TxState] {
		&self.history
	}

	pub fn advance(&mut self, next: TxState) -> Result<()> {
		let prev = self.state();
		if !next.may_follow(prev) {
			return Err(Error::InvalidTransition {
				from: prev,
				to: next,
			});
		}
		tracing::debug!(state = ?next, "lifecycle");
		self.history.push(next);
		Ok(())
	}
}

/// The record printed for an action command.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
	pub hash: String,
	pub state: TxState,
	pub outcome: Option<ExecutionOutcome>,
}

impl TransactionRecord {
	/// The chain's status string (abort code for a failed transaction).
	pub fn vm_status(&self) -> Option<&str> {
		self.outcome.as_ref().map(|o| o.vm_status.as_str())
	}
}

/// Knobs for one submission.
#[derive(Debug, Clone)]
pub struct TxOptions {
	pub max_gas_amount: u64,
	/// `None` asks the node for its current estimate.
	pub gas_unit_price: Option<u64>,
	/// Seconds from now until the chain discards the transaction.
	pub expiration_secs: u64,
	/// Bound on the wait for a terminal state.
	pub timeout: Duration,
	pub poll_interval: Duration,
}

impl Default for TxOptions {
	fn default() -> Self {
		Self {
			max_gas_amount: 2000,
			gas_unit_price: None,
			expiration_secs: 60,
			timeout: Duration::from_secs(20),
			poll_interval: Duration::from_secs(1),
		}
	}
}

/// Drives one payload from envelope to terminal state.
///
/// Every step awaits the previous one.  Nothing is retried: a rejection,
/// an abort, or a timeout is returned as-is.  A timeout only means this
/// client stopped watching; the transaction may still commit.
pub struct Submitter<'a, E: Endpoint + ?Sized, S: Signer> {
	endpoint: &'a E,
	signer: S,
	options: TxOptions,
	lifecycle: Lifecycle,
}

impl<'a, E: Endpoint + ?Sized, S: Signer> Submitter<'a, E, S> {
	pub fn new(endpoint: &'a E, signer: S, options: TxOptions) -> Self {
		Self {
			endpoint,
			signer,
			options,
			lifecycle: Lifecycle::default(),
		}
	}

	/// States visited by the most recent [`Self::execute`] call.
	pub fn history(&self) -> &[TxState] {
		self.lifecycle.history()
	}

	pub async fn execute(&mut self, payload: CallPayload) -> Result<TransactionRecord> {
		self.lifecycle = Lifecycle::default();
		tracing::info!(entry = %payload.entry, "building transaction");

		let raw = self.build(payload).await?;
		self.lifecycle.advance(TxState::Built)?;

		let signed = self.signer.sign_transaction(raw).await?;
		self.lifecycle.advance(TxState::Signed)?;

		self.lifecycle.advance(TxState::Submitted)?;
		let hash = self.endpoint.submit(&signed).await?;
		self.lifecycle.advance(TxState::Pending)?;
		tracing::info!(%hash, "transaction pending");

		let waited = self.options.timeout;
		match tokio::time::timeout(waited, self.wait_for(&hash)).await {
			Ok(Ok(outcome)) => self.finish(hash, outcome),
			Ok(Err(e)) => {
				self.lifecycle.advance(TxState::TimedOut)?;
				tracing::warn!(%hash, error = %e, "node refused status poll; transaction state unknown");
				Err(Error::Unconfirmed {
					hash,
					reason: e.to_string(),
				})
			}
			Err(_) => {
				self.lifecycle.advance(TxState::TimedOut)?;
				tracing::warn!(%hash, ?waited, "gave up waiting; transaction state unknown");
				Err(Error::TimedOut { hash, waited })
			}
		}
	}

	/// Fetch chain id, sequence number and gas price, then assemble the
	/// unsigned envelope.
	async fn build(&self, payload: CallPayload) -> Result<RawTransaction> {
		let sender = self.signer.address();
		let chain_id = self.endpoint.chain_id().await?;
		let sequence_number = self.endpoint.sequence_number(sender).await?;
		let gas_unit_price = match self.options.gas_unit_price {
			Some(price) => price,
			None => self.endpoint.gas_unit_price().await?,
		};
		let now = chrono::Utc::now().timestamp().max(0) as u64;

		tracing::debug!(%sender, sequence_number, chain_id, gas_unit_price, "envelope");
		Ok(RawTransaction {
			sender,
			sequence_number,
			payload: TransactionPayload(payload),
			max_gas_amount: self.options.max_gas_amount,
			gas_unit_price,
			expiration_timestamp_secs: now + self.options.expiration_secs,
			chain_id,
		})
	}

	/// Poll until the node reports the transaction as committed.
	/// Unknown and pending hashes both mean "keep waiting", and so do
	/// transient node errors; the caller's timeout bounds the loop.
	async fn wait_for(&self, hash: &str) -> Result<ExecutionOutcome> {
		loop {
			match self.endpoint.transaction(hash).await {
				Ok(Some(TransactionStatus::Committed(outcome))) => return Ok(outcome),
				Ok(Some(TransactionStatus::Pending) | None) => {}
				Err(e) if e.is_transient() => {
					tracing::warn!(%hash, error = %e, "status poll failed; retrying");
				}
				Err(e) => return Err(e),
			}
			tokio::time::sleep(self.options.poll_interval).await;
		}
	}

	fn finish(&mut self, hash: String, outcome: ExecutionOutcome) -> Result<TransactionRecord> {
		let state = if outcome.success {
			TxState::Confirmed
		} else {
			TxState::Failed
		};
		self.lifecycle.advance(state)?;

		let record = TransactionRecord {
			hash,
			state,
			outcome: Some(outcome),
		};
		if state == TxState::Failed {
			tracing::warn!(hash = %record.hash, vm_status = record.vm_status(), "transaction aborted");
			return Err(Error::TransactionFailed(Box::new(record)));
		}
		tracing::info!(hash = %record.hash, "transaction confirmed");
		Ok(record)
	}
}
