use std::fmt;

use ed25519_dalek::{Signer as _, SigningKey};
use sha3::{Digest, Sha3_256};

use crate::address::AccountAddress;
use crate::error::{Error, Result};
use crate::tx_builder::{RawTransaction, SignedTransaction, TransactionAuthenticator};

/// Authentication-key scheme byte for single Ed25519 keys.
const ED25519_SCHEME: u8 = 0x00;

/// An account address plus the Ed25519 key that controls it, resolved
/// once per invocation from the active profile.
pub struct SigningIdentity {
	address: AccountAddress,
	key: SigningKey,
}

impl SigningIdentity {
	/// Parse a hex private key (`0x…`, bare, or `ed25519-priv-0x…`) and
	/// derive the account address from its public key.
	pub fn from_private_key(material: &str) -> Result<Self> {
		let digits = material.trim();
		let digits = digits.strip_prefix("ed25519-priv-").unwrap_or(digits);
		let digits = digits.strip_prefix("0x").unwrap_or(digits);

		let mut seed = [0u8; 32];
		hex::decode_to_slice(digits, &mut seed)
			.map_err(|e| Error::SigningError(format!("private key must be 32 bytes of hex: {e}")))?;

		let key = SigningKey::from_bytes(&seed);
		let address = derive_address(&key);
		Ok(Self { address, key })
	}

	/// Use an explicit account address instead of the derived one (the
	/// key may have been rotated onto an older account).
	pub fn with_address(mut self, address: AccountAddress) -> Self {
		self.address = address;
		self
	}

	/// Address implied by the key alone, ignoring any override.
	pub fn derived_address(&self) -> AccountAddress {
		derive_address(&self.key)
	}

	pub fn public_key_hex(&self) -> String {
		format!("0x{}", hex::encode(self.key.verifying_key().as_bytes()))
	}

	fn sign_raw(&self, raw: RawTransaction) -> Result<SignedTransaction> {
		let message = raw.signing_message()?;
		let signature = self
			.key
			.try_sign(&message)
			.map_err(|e| Error::SigningError(e.to_string()))?;

		Ok(SignedTransaction {
			raw_txn: raw,
			authenticator: TransactionAuthenticator::Ed25519 {
				public_key: self.key.verifying_key().to_bytes().to_vec(),
				signature: signature.to_bytes().to_vec(),
			},
		})
	}
}

#[async_trait::async_trait]
impl super::Signer for SigningIdentity {
	fn address(&self) -> AccountAddress {
		self.address
	}

	async fn sign_transaction(&self, raw: RawTransaction) -> Result<SignedTransaction> {
		self.sign_raw(raw)
	}
}

impl fmt::Debug for SigningIdentity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SigningIdentity")
			.field("address", &self.address)
			.field("key", &"<redacted>")
			.finish()
	}
}

/// `SHA3-256(public_key || scheme)` is both the authentication key and,
/// for a fresh account, its address.
fn derive_address(key: &SigningKey) -> AccountAddress {
	let mut h = Sha3_256::new();
	h.update(key.verifying_key().as_bytes());
	h.update([ED25519_SCHEME]);
	AccountAddress::new(h.finalize().into())
}

#[cfg(test)]
mod tests {
	use ed25519_dalek::{Signature, Verifier};

	use super::*;
	use crate::signer::Signer;
	use crate::tx_builder::{ArgKind, CallPayload, TransactionPayload};

	const KEY: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

	fn raw_for(sender: AccountAddress) -> RawTransaction {
		let entry = "0xcafe::lend2::admin_init".parse().unwrap();
		let amount = ArgKind::U64.encode("amount", "5").unwrap();
		RawTransaction {
			sender,
			sequence_number: 0,
			payload: TransactionPayload(CallPayload::new(entry, vec![], vec![amount])),
			max_gas_amount: 2000,
			gas_unit_price: 100,
			expiration_timestamp_secs: 1_700_000_060,
			chain_id: 4,
		}
	}

	#[test]
	fn identity_is_deterministic() {
		let a = SigningIdentity::from_private_key(KEY).unwrap();
		let b = SigningIdentity::from_private_key(KEY.trim_start_matches("0x")).unwrap();
		let c = SigningIdentity::from_private_key(&format!("ed25519-priv-{KEY}")).unwrap();
		assert_eq!(a.address, b.address);
		assert_eq!(a.address, c.address);
		assert_eq!(a.public_key_hex(), b.public_key_hex());
	}

	#[test]
	fn address_override_keeps_key() {
		let id = SigningIdentity::from_private_key(KEY)
			.unwrap()
			.with_address(AccountAddress::ONE);
		assert_eq!(id.address(), AccountAddress::ONE);
		assert_ne!(id.derived_address(), AccountAddress::ONE);
	}

	#[test]
	fn bad_key_material_is_a_signing_error() {
		let too_long = "ab".repeat(33);
		for bad in ["", "0x1234", "zz", too_long.as_str()] {
			assert!(matches!(
				SigningIdentity::from_private_key(bad),
				Err(Error::SigningError(_))
			));
		}
	}

	#[test]
	fn debug_does_not_leak_key() {
		let id = SigningIdentity::from_private_key(KEY).unwrap();
		let dbg = format!("{id:?}");
		assert!(dbg.contains("redacted"));
		assert!(!dbg.contains("1111111111"));
	}

	#[tokio::test]
	async fn signature_verifies_over_signing_message() {
		let id = SigningIdentity::from_private_key(KEY).unwrap();
		let raw = raw_for(id.address());
		let message = raw.signing_message().unwrap();

		let signed = id.sign_transaction(raw).await.unwrap();
		let TransactionAuthenticator::Ed25519 { public_key, signature } = &signed.authenticator;
		assert_eq!(format!("0x{}", hex::encode(public_key)), id.public_key_hex());

		let sig = Signature::from_slice(signature).unwrap();
		id.key.verifying_key().verify(&message, &sig).unwrap();
	}
}
