use anyhow::Result;

use crate::cli::{Cli, TxCommand};
use crate::commands::resolve_rpc;
use crate::rpc::{normalize_hash, Endpoint, TransactionStatus};

pub async fn run(cli: &Cli, cmd: &TxCommand) -> Result<()> {
	let rpc = resolve_rpc(cli)?;

	match cmd {
		TxCommand::Status { tx_hash } => {
			let hash = normalize_hash(tx_hash)?;
			match rpc.transaction(&hash).await? {
				Some(TransactionStatus::Pending) => {
					println!("Transaction: {hash}");
					println!("Status:      pending");
				}
				Some(TransactionStatus::Committed(outcome)) => {
					let status = if outcome.success { "confirmed" } else { "failed" };
					println!("Transaction: {hash}");
					println!("Status:      {status}");
					println!("VM status:   {}", outcome.vm_status);
					println!("Version:     {}", outcome.version);
					println!("Gas used:    {}", outcome.gas_used);
				}
				None => println!("Transaction not found: {hash}"),
			}
			Ok(())
		}
	}
}
