use anyhow::Result;

use crate::address::AccountAddress;
use crate::cli::Cli;
use crate::commands::{load_config, query, resolve_module_address, resolve_signer};
use crate::contracts::{self, EntryCommand};
use crate::error::Error;
use crate::rpc::Endpoint;
use crate::signer::{Signer, SigningIdentity};
use crate::submitter::{Submitter, TransactionRecord, TxOptions};
use crate::tx_builder::CallPayload;
use crate::type_tag::TypeDescriptor;

/// Dispatch `<module>:<command> [args...]` through the command tables.
pub async fn run(cli: &Cli, argv: &[String]) -> Result<()> {
	let Some((name, args)) = argv.split_first() else {
		anyhow::bail!("no command given; run `move-call list`");
	};

	if let Some(cmd) = contracts::find_query(name) {
		return query::run(cli, cmd, args).await;
	}
	let cmd = contracts::find_entry(name).ok_or_else(|| Error::UnknownCommand(name.clone()))?;

	let config = load_config(cli)?;
	let (rpc, identity) = resolve_signer(cli, &config)?;
	let module_address = resolve_module_address(cli, identity.address())?;
	announce(&identity, module_address);
	let payload = build_payload(cmd, module_address, args)?;

	let record = submit(&rpc, identity, cli.tx_options(), payload).await?;
	println!("{}", serde_json::to_string_pretty(&record)?);
	Ok(())
}

/// Tell the operator which account is about to sign.
fn announce<S: Signer>(signer: &S, module_address: AccountAddress) {
	tracing::info!(module = %module_address, "using address {}", signer.address());
}

/// Check the argument count, then parse the leading type arguments and
/// encode the rest in declaration order.
pub fn build_payload(
	cmd: &EntryCommand,
	module_address: AccountAddress,
	args: &[String],
) -> crate::error::Result<CallPayload> {
	if args.len() != cmd.arity() {
		return Err(Error::ArityMismatch {
			command: cmd.name.to_owned(),
			expected: cmd.arity(),
			got: args.len(),
			usage: cmd.usage(),
		});
	}

	let (type_args, values) = args.split_at(cmd.type_params.len());
	let type_args = type_args
		.iter()
		.map(|t| t.parse::<TypeDescriptor>())
		.collect::<crate::error::Result<Vec<_>>>()?;
	let values = cmd
		.args
		.iter()
		.zip(values)
		.map(|((name, kind), raw)| kind.encode(name, raw))
		.collect::<crate::error::Result<Vec<_>>>()?;

	Ok(CallPayload::new(cmd.entry_point(module_address), type_args, values))
}

/// Run the payload to a terminal state.  An aborted transaction still
/// has its record printed before the error goes up.
async fn submit<E: Endpoint + ?Sized>(
	endpoint: &E,
	identity: SigningIdentity,
	options: TxOptions,
	payload: CallPayload,
) -> crate::error::Result<TransactionRecord> {
	let mut submitter = Submitter::new(endpoint, identity, options);
	match submitter.execute(payload).await {
		Err(Error::TransactionFailed(record)) => {
			if let Ok(json) = serde_json::to_string_pretty(&record) {
				println!("{json}");
			}
			Err(Error::TransactionFailed(record))
		}
		other => other,
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;
	use std::sync::{Arc, Mutex};

	use super::*;
	use crate::tx_builder::EncodedArg;

	/// Collects formatted log lines.
	#[derive(Clone, Default)]
	struct Captured(Arc<Mutex<Vec<u8>>>);

	impl Write for Captured {
		fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
			self.0.lock().unwrap().extend_from_slice(buf);
			Ok(buf.len())
		}

		fn flush(&mut self) -> std::io::Result<()> {
			Ok(())
		}
	}

	fn args(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	fn module() -> AccountAddress {
		"0xcafe".parse().unwrap()
	}

	#[test]
	fn deposit_payload() {
		let cmd = contracts::find_entry("lend2:deposit").unwrap();
		let p = build_payload(cmd, module(), &args(&["0x1::aptos_coin::AptosCoin", "1000"])).unwrap();

		assert_eq!(p.entry.to_string(), "0xcafe::lend2::deposit");
		assert_eq!(p.type_args.len(), 1);
		assert_eq!(p.type_args[0].to_string(), "0x1::aptos_coin::AptosCoin");
		assert_eq!(p.args, vec![EncodedArg::encode(&1000u64).unwrap()]);
	}

	#[test]
	fn no_argument_command() {
		let cmd = contracts::find_entry("lend2:price-drop").unwrap();
		let p = build_payload(cmd, module(), &[]).unwrap();
		assert!(p.type_args.is_empty());
		assert!(p.args.is_empty());
	}

	#[test]
	fn arity_is_checked_before_parsing() {
		let cmd = contracts::find_entry("lend2:borrow").unwrap();
		let err = build_payload(cmd, module(), &args(&["not a type"])).unwrap_err();
		assert!(matches!(err, Error::ArityMismatch { expected: 2, got: 1, .. }));
		assert!(err.to_string().ends_with("usage: lend2:borrow <TYPE_CoinType> <amount:u64>"));

		let cmd = contracts::find_entry("lend2:admin-init").unwrap();
		assert!(matches!(
			build_payload(cmd, module(), &args(&["extra"])),
			Err(Error::ArityMismatch { expected: 0, got: 1, .. })
		));
	}

	#[test]
	fn bad_type_and_bad_value_are_reported() {
		let cmd = contracts::find_entry("lend2:repay").unwrap();
		assert!(matches!(
			build_payload(cmd, module(), &args(&["Foo<Bar", "1"])),
			Err(Error::MalformedTypeTag { .. })
		));
		assert!(matches!(
			build_payload(cmd, module(), &args(&["0x1::aptos_coin::AptosCoin", "-1"])),
			Err(Error::InvalidArgument { .. })
		));
	}

	#[test]
	fn signing_address_is_logged_at_info() {
		let out = Captured::default();
		let writer = out.clone();
		let subscriber = tracing_subscriber::fmt()
			.with_max_level(tracing::Level::INFO)
			.with_ansi(false)
			.with_writer(move || writer.clone())
			.finish();

		let signer = SigningIdentity::from_private_key(&"44".repeat(32)).unwrap();
		let address = signer.address();
		tracing::subscriber::with_default(subscriber, || announce(&signer, module()));

		let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
		assert!(text.contains("INFO"), "{text}");
		assert!(text.contains(&format!("using address {address}")), "{text}");
	}
}
