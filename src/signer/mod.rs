pub mod local;

pub use local::SigningIdentity;

use crate::address::AccountAddress;
use crate::error::Result;
use crate::tx_builder::{RawTransaction, SignedTransaction};

/// Something that can authorize transactions for one account.
///
/// The only implementation today holds the key in memory
/// ([`SigningIdentity`]); the seam exists so hardware or remote signers
/// can slot in without touching the submitter.
#[async_trait::async_trait]
pub trait Signer: Send + Sync {
	/// The account this signer controls.
	fn address(&self) -> AccountAddress;

	/// Sign the envelope and return it ready to broadcast.
	async fn sign_transaction(&self, raw: RawTransaction) -> Result<SignedTransaction>;
}
