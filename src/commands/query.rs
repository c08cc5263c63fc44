use anyhow::Result;
use serde_json::Value;

use crate::address::AccountAddress;
use crate::cli::Cli;
use crate::commands::{load_config, resolve_rpc, resolve_signer};
use crate::contracts::{self, QueryCommand};
use crate::decoder::{self, DecodedResource};
use crate::error::Error;
use crate::rpc::{Endpoint, RestClient};
use crate::signer::Signer;

pub async fn run(cli: &Cli, cmd: &QueryCommand, args: &[String]) -> Result<()> {
	check_arity(cmd, args)?;

	// Only a missing --module-address needs the profile's key.
	let (rpc, module_address): (RestClient, AccountAddress) = match &cli.module_address {
		Some(addr) => (resolve_rpc(cli)?, addr.parse()?),
		None => {
			let config = load_config(cli)?;
			let (rpc, identity) = resolve_signer(cli, &config)?;
			(rpc, identity.address())
		}
	};

	let value = fetch(&rpc, cmd, module_address).await?;
	println!("{}", serde_json::to_string_pretty(&value)?);
	Ok(())
}

/// Queries take no arguments.
fn check_arity(cmd: &QueryCommand, args: &[String]) -> crate::error::Result<()> {
	if args.is_empty() {
		return Ok(());
	}
	Err(Error::ArityMismatch {
		command: cmd.name.to_owned(),
		expected: 0,
		got: args.len(),
		usage: String::new(),
	})
}

/// Read the query's resource from the module account and project it.
pub async fn fetch<E: Endpoint + ?Sized>(
	endpoint: &E,
	cmd: &QueryCommand,
	module_address: AccountAddress,
) -> crate::error::Result<Value> {
	let ty = cmd.resource_type(module_address)?;
	let repo = contracts::contract_layouts(module_address)?;
	let bytes = endpoint
		.resource(module_address, &ty)
		.await?
		.ok_or_else(|| Error::Rpc {
			status: 404,
			message: format!("{ty} not found under {module_address}"),
		})?;
	let decoded = decoder::decode(&repo, &ty, &bytes)?;
	project(cmd, &decoded)
}

fn project(cmd: &QueryCommand, decoded: &DecodedResource) -> crate::error::Result<Value> {
	let Some(field) = cmd.field else {
		return Ok(decoded.to_json());
	};
	decoded
		.value
		.field(field)
		.map(|v| v.to_json())
		.ok_or_else(|| Error::DecodeMismatch(format!("{} has no field `{field}`", decoded.type_tag)))
}
