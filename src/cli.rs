use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::submitter::TxOptions;

#[derive(Parser)]
#[command(
	name = "move-call",
	about = "Call Move entry functions and read resources on an Aptos node.",
	version
)]
pub struct Cli {
	/// Profiles file (default: ./.aptos/config.yaml, then ~/.aptos/config.yaml).
	#[arg(short, long, global = true)]
	pub config: Option<PathBuf>,

	/// Profile to sign and connect with.
	#[arg(short, long, default_value = "default", global = true)]
	pub profile: String,

	/// Override the profile's REST endpoint.
	#[arg(long, global = true)]
	pub url: Option<String>,

	/// Account the contract modules are published under (default: signer).
	#[arg(long, global = true)]
	pub module_address: Option<String>,

	/// Maximum gas units a transaction may consume.
	#[arg(long, default_value_t = 2000, global = true)]
	pub max_gas: u64,

	/// Gas unit price in octas (default: the node's estimate).
	#[arg(long, global = true)]
	pub gas_price: Option<u64>,

	/// Seconds to wait for a submitted transaction to commit.
	#[arg(long, default_value_t = 20, global = true)]
	pub timeout_secs: u64,

	#[command(subcommand)]
	pub command: Command,
}

impl Cli {
	pub fn tx_options(&self) -> TxOptions {
		TxOptions {
			max_gas_amount: self.max_gas,
			gas_unit_price: self.gas_price,
			timeout: Duration::from_secs(self.timeout_secs),
			..TxOptions::default()
		}
	}
}

#[derive(Subcommand)]
pub enum Command {
	/// List the contract commands and their arguments.
	List,

	/// Show the active profile's address, endpoint and sequence number.
	Account,

	/// Check transaction status on-chain.
	Tx {
		#[command(subcommand)]
		command: TxCommand,
	},

	/// Fetch and decode a resource stored under an account.
	Resource {
		/// Account address (0x-prefixed).
		address: String,

		/// Fully qualified struct type, e.g. `0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>`.
		type_tag: String,
	},

	/// `<module>:<command> [args...]`, see `list`.
	#[command(external_subcommand)]
	Call(Vec<String>),
}

// -- Tx subcommands --

#[derive(Subcommand)]
pub enum TxCommand {
	/// Check confirmation status of a transaction.
	Status {
		/// Transaction hash (0x-prefixed).
		tx_hash: String,
	},
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn table_commands_are_external() {
		let cli = Cli::try_parse_from(["move-call", "-p", "dev", "lend2:deposit", "0x1::aptos_coin::AptosCoin", "10"])
			.unwrap();
		assert_eq!(cli.profile, "dev");
		let Command::Call(argv) = cli.command else {
			panic!("expected external subcommand");
		};
		assert_eq!(argv, ["lend2:deposit", "0x1::aptos_coin::AptosCoin", "10"]);
	}

	#[test]
	fn gas_flags_flow_into_options() {
		let cli = Cli::try_parse_from(["move-call", "--max-gas", "5000", "--gas-price", "150", "list"]).unwrap();
		let opts = cli.tx_options();
		assert_eq!(opts.max_gas_amount, 5000);
		assert_eq!(opts.gas_unit_price, Some(150));
		assert_eq!(opts.timeout, Duration::from_secs(20));
	}

	#[test]
	fn tx_status_takes_a_hash() {
		let cli = Cli::try_parse_from(["move-call", "tx", "status", "0xabc"]).unwrap();
		assert!(matches!(cli.command, Command::Tx { command: TxCommand::Status { ref tx_hash } } if tx_hash == "0xabc"));
	}
}
