use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use sha3::{Digest, Sha3_256};

use crate::address::AccountAddress;
use crate::error::{Error, Result};
use crate::type_tag::TypeDescriptor;

/// Domain separator hashed in front of every raw transaction before signing.
const RAW_TRANSACTION_SALT: &[u8] = b"APTOS::RawTransaction";

/// A published Move module: `address::name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleId {
	pub address: AccountAddress,
	pub name: String,
}

/// The function being called: `address::module::function`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
	pub module: ModuleId,
	pub function: String,
}

impl EntryPoint {
	pub fn new(address: AccountAddress, module: &str, function: &str) -> Self {
		Self {
			module: ModuleId {
				address,
				name: module.to_owned(),
			},
			function: function.to_owned(),
		}
	}
}

impl fmt::Display for EntryPoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}::{}::{}", self.module.address, self.module.name, self.function)
	}
}

impl FromStr for EntryPoint {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let invalid = |reason: &str| Error::InvalidArgument {
			name: "entry point".into(),
			reason: format!("`{s}` {reason}"),
		};
		let parts: Vec<&str> = s.split("::").collect();
		let [address, module, function] = parts.as_slice() else {
			return Err(invalid("must look like 0xADDR::module::function"));
		};
		if module.is_empty() || function.is_empty() {
			return Err(invalid("has an empty module or function name"));
		}
		Ok(Self::new(address.parse()?, module, function))
	}
}

/// One BCS-encoded entry-function argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedArg(Vec<u8>);

impl EncodedArg {
	pub fn encode<T: Serialize>(value: &T) -> Result<Self> {
		Ok(Self(bcs::to_bytes(value)?))
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

/// Shape of a plain (non-generic) argument as the operator types it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
	U8,
	U16,
	U32,
	U64,
	U128,
	Bool,
	Address,
	/// `vector<u8>` given as hex.
	Bytes,
	/// `0x1::string::String` given as plain text.
	Utf8,
}

impl ArgKind {
	/// Move type name shown in usage strings.
	pub fn move_type(&self) -> &'static str {
		match self {
			Self::U8 => "u8",
			Self::U16 => "u16",
			Self::U32 => "u32",
			Self::U64 => "u64",
			Self::U128 => "u128",
			Self::Bool => "bool",
			Self::Address => "address",
			Self::Bytes => "vector<u8>",
			Self::Utf8 => "string",
		}
	}

	/// Parse `raw` according to this shape and BCS-encode it.
	pub fn encode(&self, name: &str, raw: &str) -> Result<EncodedArg> {
		let bad = |reason: String| Error::InvalidArgument {
			name: name.to_owned(),
			reason,
		};
		let num_err = |e: std::num::ParseIntError| bad(format!("`{raw}` is not a {}: {e}", self.move_type()));

		match self {
			Self::U8 => EncodedArg::encode(&raw.parse::<u8>().map_err(num_err)?),
			Self::U16 => EncodedArg::encode(&raw.parse::<u16>().map_err(num_err)?),
			Self::U32 => EncodedArg::encode(&raw.parse::<u32>().map_err(num_err)?),
			Self::U64 => EncodedArg::encode(&raw.parse::<u64>().map_err(num_err)?),
			Self::U128 => EncodedArg::encode(&raw.parse::<u128>().map_err(num_err)?),
			Self::Bool => match raw {
				"true" => EncodedArg::encode(&true),
				"false" => EncodedArg::encode(&false),
				_ => Err(bad(format!("`{raw}` is not true or false"))),
			},
			Self::Address => {
				let addr: AccountAddress = raw.parse().map_err(|e| bad(format!("{e}")))?;
				EncodedArg::encode(&addr)
			}
			Self::Bytes => {
				let bytes = hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
					.map_err(|e| bad(format!("`{raw}` is not hex: {e}")))?;
				EncodedArg::encode(&bytes)
			}
			Self::Utf8 => EncodedArg::encode(&raw),
		}
	}
}

/// An entry-function call ready to be wrapped in a transaction.
///
/// Assembly only: nothing here checks the arguments against the
/// function's on-chain signature.  A wrong arity or type surfaces as an
/// execution failure once the chain sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallPayload {
	pub entry: EntryPoint,
	pub type_args: Vec<TypeDescriptor>,
	pub args: Vec<EncodedArg>,
}

impl CallPayload {
	pub fn new(entry: EntryPoint, type_args: Vec<TypeDescriptor>, args: Vec<EncodedArg>) -> Self {
		Self { entry, type_args, args }
	}
}

/// Wire wrapper selecting the entry-function variant of the chain's
/// transaction payload enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPayload(pub CallPayload);

impl Serialize for TransactionPayload {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_newtype_variant("TransactionPayload", 2, "EntryFunction", &self.0)
	}
}

/// The unsigned transaction envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawTransaction {
	pub sender: AccountAddress,
	pub sequence_number: u64,
	pub payload: TransactionPayload,
	pub max_gas_amount: u64,
	pub gas_unit_price: u64,
	pub expiration_timestamp_secs: u64,
	pub chain_id: u8,
}

impl RawTransaction {
	/// Bytes the sender signs: `SHA3-256(salt) || BCS(self)`.
	pub fn signing_message(&self) -> Result<Vec<u8>> {
		let mut msg = Sha3_256::digest(RAW_TRANSACTION_SALT).to_vec();
		msg.extend(bcs::to_bytes(self)?);
		Ok(msg)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TransactionAuthenticator {
	Ed25519 { public_key: Vec<u8>, signature: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedTransaction {
	pub raw_txn: RawTransaction,
	pub authenticator: TransactionAuthenticator,
}

impl SignedTransaction {
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		Ok(bcs::to_bytes(self)?)
	}
}
