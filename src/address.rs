use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 32-byte Aptos account address.
///
/// Serializes as a fixed 32-byte tuple, which is the BCS layout the chain
/// uses for `address`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountAddress([u8; 32]);

impl AccountAddress {
	pub const LENGTH: usize = 32;
	pub const ONE: Self = Self::from_u8(1);

	pub const fn new(bytes: [u8; 32]) -> Self {
		Self(bytes)
	}

	const fn from_u8(b: u8) -> Self {
		let mut bytes = [0u8; 32];
		bytes[31] = b;
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8; 32] {
		&self.0
	}

	/// Full 64-digit form, as the REST API path segments expect.
	pub fn to_long_string(&self) -> String {
		format!("0x{}", hex::encode(self.0))
	}
}

impl fmt::Display for AccountAddress {
	/// Short form with leading zeros trimmed (`0x1`).
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let full = hex::encode(self.0);
		let trimmed = full.trim_start_matches('0');
		if trimmed.is_empty() {
			write!(f, "0x0")
		} else {
			write!(f, "0x{trimmed}")
		}
	}
}

impl FromStr for AccountAddress {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let digits = s.strip_prefix("0x").unwrap_or(s);
		if digits.is_empty() || digits.len() > 64 {
			return Err(Error::InvalidArgument {
				name: "address".into(),
				reason: format!("`{s}` must have 1 to 64 hex digits"),
			});
		}
		let padded = format!("{digits:0>64}");
		let mut bytes = [0u8; 32];
		hex::decode_to_slice(&padded, &mut bytes).map_err(|e| Error::InvalidArgument {
			name: "address".into(),
			reason: format!("`{s}`: {e}"),
		})?;
		Ok(Self(bytes))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_form_is_left_padded() {
		let a: AccountAddress = "0x1".parse().unwrap();
		assert_eq!(a, AccountAddress::ONE);
		assert_eq!(a.as_bytes()[31], 1);
		assert!(a.as_bytes()[..31].iter().all(|b| *b == 0));
	}

	#[test]
	fn display_trims_leading_zeros() {
		let a: AccountAddress = "0x00000000000000000000000000000000000000000000000000000000000000ab"
			.parse()
			.unwrap();
		assert_eq!(a.to_string(), "0xab");
		assert_eq!(a.to_long_string().len(), 66);
		assert_eq!(AccountAddress::new([0; 32]).to_string(), "0x0");
	}

	#[test]
	fn rejects_bad_hex() {
		assert!("0x".parse::<AccountAddress>().is_err());
		assert!("0xzz".parse::<AccountAddress>().is_err());
		assert!(format!("0x{}", "1".repeat(65)).parse::<AccountAddress>().is_err());
	}

	#[test]
	fn bcs_layout_is_fixed_32_bytes() {
		let bytes = bcs::to_bytes(&AccountAddress::ONE).unwrap();
		assert_eq!(bytes.len(), 32);
		assert_eq!(bytes[31], 1);
	}
}
