use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::address::AccountAddress;
use crate::error::{Error, Result};
use crate::tx_builder::SignedTransaction;
use crate::type_tag::TypeDescriptor;

const SIGNED_TXN_BCS: &str = "application/x.aptos.signed_transaction+bcs";
const BCS: &str = "application/x-bcs";

/// What the node reports for a transaction hash.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionStatus {
	/// Accepted into the mempool, not yet executed.
	Pending,
	/// Included in a block; `success` tells whether it aborted.
	Committed(ExecutionOutcome),
}

/// Execution result of a committed transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionOutcome {
	pub success: bool,
	pub vm_status: String,
	pub gas_used: u64,
	pub version: u64,
	/// The node's full JSON for the transaction (events, changes, ...).
	pub details: Value,
}

/// The remote ledger, reduced to the calls the pipeline needs.  Tests
/// substitute an in-memory fake.
#[async_trait]
pub trait Endpoint: Send + Sync {
	async fn chain_id(&self) -> Result<u8>;

	async fn sequence_number(&self, account: AccountAddress) -> Result<u64>;

	async fn gas_unit_price(&self) -> Result<u64>;

	/// Hand a signed transaction to the node.  Returns the hash once the
	/// node has queued it, or `SubmissionRejected` if it refuses outright.
	async fn submit(&self, txn: &SignedTransaction) -> Result<String>;

	/// `None` when the node has never heard of the hash.
	async fn transaction(&self, hash: &str) -> Result<Option<TransactionStatus>>;

	/// Raw BCS bytes of a resource, `None` when the account lacks it.
	async fn resource(&self, account: AccountAddress, ty: &TypeDescriptor) -> Result<Option<Vec<u8>>>;
}

/// Client for the Aptos node REST API (v1).
pub struct RestClient {
	base: String,
	http: reqwest::Client,
}

impl RestClient {
	/// `url` must already point at the API root (`…/v1`).
	pub fn new(url: &str) -> Self {
		Self {
			base: url.trim_end_matches('/').to_owned(),
			http: reqwest::Client::new(),
		}
	}

	pub fn base_url(&self) -> &str {
		&self.base
	}

	fn url(&self, path: &str) -> String {
		format!("{}{path}", self.base)
	}

	/// GET a JSON document; a 404 comes back as `None`.
	async fn get_json(&self, path: &str) -> Result<Option<Value>> {
		tracing::debug!(path, "GET");
		let resp = self.http.get(self.url(path)).send().await?;
		if resp.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}
		let resp = check(resp).await?;
		Ok(Some(resp.json().await?))
	}

	async fn get_json_required(&self, path: &str) -> Result<Value> {
		self.get_json(path).await?.ok_or_else(|| Error::Rpc {
			status: StatusCode::NOT_FOUND.as_u16(),
			message: format!("{path} not found"),
		})
	}
}

#[async_trait]
impl Endpoint for RestClient {
	async fn chain_id(&self) -> Result<u8> {
		let info = self.get_json_required("").await?;
		let id = u64_field(&info, "chain_id")?;
		u8::try_from(id).map_err(|_| Error::Rpc {
			status: 200,
			message: format!("chain_id {id} out of range"),
		})
	}

	async fn sequence_number(&self, account: AccountAddress) -> Result<u64> {
		let path = format!("/accounts/{}", account.to_long_string());
		let info = self.get_json(&path).await?.ok_or_else(|| Error::Rpc {
			status: StatusCode::NOT_FOUND.as_u16(),
			message: format!("account {account} does not exist on chain; fund it first"),
		})?;
		u64_field(&info, "sequence_number")
	}

	async fn gas_unit_price(&self) -> Result<u64> {
		let estimate = self.get_json_required("/estimate_gas_price").await?;
		u64_field(&estimate, "gas_estimate")
	}

	async fn submit(&self, txn: &SignedTransaction) -> Result<String> {
		let body = txn.to_bytes()?;
		tracing::debug!(bytes = body.len(), "POST /transactions");
		let resp = self
			.http
			.post(self.url("/transactions"))
			.header(CONTENT_TYPE, SIGNED_TXN_BCS)
			.body(body)
			.send()
			.await?;

		let status = resp.status();
		if !status.is_success() {
			let err = error_body(resp).await;
			return Err(Error::SubmissionRejected {
				status: status.as_u16(),
				message: err.message,
				vm_error_code: err.vm_error_code,
			});
		}

		let pending: Value = resp.json().await?;
		pending
			.get("hash")
			.and_then(Value::as_str)
			.map(str::to_owned)
			.ok_or_else(|| Error::Rpc {
				status: status.as_u16(),
				message: "submission response has no hash".into(),
			})
	}

	async fn transaction(&self, hash: &str) -> Result<Option<TransactionStatus>> {
		let Some(txn) = self.get_json(&format!("/transactions/by_hash/{hash}")).await? else {
			return Ok(None);
		};
		parse_transaction(txn).map(Some)
	}

	async fn resource(&self, account: AccountAddress, ty: &TypeDescriptor) -> Result<Option<Vec<u8>>> {
		// The canonical form has spaces after commas; the path must not.
		let ty = ty.to_string().replace(' ', "");
		let path = format!("/accounts/{}/resource/{ty}", account.to_long_string());
		tracing::debug!(%path, "GET (bcs)");

		let resp = self.http.get(self.url(&path)).header(ACCEPT, BCS).send().await?;
		if resp.status() == StatusCode::NOT_FOUND {
			return Ok(None);
		}
		let resp = check(resp).await?;
		Ok(Some(resp.bytes().await?.to_vec()))
	}
}

/// Turn the node's transaction JSON into a status.
pub fn parse_transaction(txn: Value) -> Result<TransactionStatus> {
	let kind = txn.get("type").and_then(Value::as_str).unwrap_or_default();
	if kind == "pending_transaction" {
		return Ok(TransactionStatus::Pending);
	}

	let success = txn.get("success").and_then(Value::as_bool).ok_or_else(|| Error::Rpc {
		status: 200,
		message: format!("committed `{kind}` transaction has no success flag"),
	})?;
	let vm_status = txn
		.get("vm_status")
		.and_then(Value::as_str)
		.unwrap_or_default()
		.to_owned();
	let gas_used = u64_field(&txn, "gas_used")?;
	let version = u64_field(&txn, "version")?;

	Ok(TransactionStatus::Committed(ExecutionOutcome {
		success,
		vm_status,
		gas_used,
		version,
		details: txn,
	}))
}

/// Transaction hashes are 32 bytes of 0x-prefixed hex.
pub fn normalize_hash(hash: &str) -> Result<String> {
	let digits = hash.strip_prefix("0x").unwrap_or(hash);
	if digits.len() != 64 || hex::decode(digits).is_err() {
		return Err(Error::InvalidArgument {
			name: "hash".into(),
			reason: format!("`{hash}` is not a 32-byte hex hash"),
		});
	}
	Ok(format!("0x{}", digits.to_ascii_lowercase()))
}

// -- Private helpers --

/// The REST API encodes u64 values as decimal strings; accept numbers too.
fn u64_field(v: &Value, key: &str) -> Result<u64> {
	let field = v.get(key);
	field
		.and_then(Value::as_u64)
		.or_else(|| field.and_then(Value::as_str).and_then(|s| s.parse().ok()))
		.ok_or_else(|| Error::Rpc {
			status: 200,
			message: format!("missing or invalid `{key}` in node response"),
		})
}

struct ErrorBody {
	message: String,
	vm_error_code: Option<u64>,
}

async fn error_body(resp: Response) -> ErrorBody {
	let status = resp.status();
	let text = resp.text().await.unwrap_or_default();
	match serde_json::from_str::<Value>(&text) {
		Ok(v) => ErrorBody {
			message: v
				.get("message")
				.and_then(Value::as_str)
				.map(str::to_owned)
				.unwrap_or(text),
			vm_error_code: v.get("vm_error_code").and_then(Value::as_u64),
		},
		Err(_) if text.is_empty() => ErrorBody {
			message: status.to_string(),
			vm_error_code: None,
		},
		Err(_) => ErrorBody {
			message: text,
			vm_error_code: None,
		},
	}
}

async fn check(resp: Response) -> Result<Response> {
	let status = resp.status();
	if status.is_success() {
		return Ok(resp);
	}
	let err = error_body(resp).await;
	Err(Error::Rpc {
		status: status.as_u16(),
		message: err.message,
	})
}
