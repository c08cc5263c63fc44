use anyhow::Result;

use crate::address::AccountAddress;
use crate::cli::Cli;
use crate::commands::resolve_rpc;
use crate::contracts;
use crate::decoder;
use crate::error::Error;
use crate::rpc::Endpoint;
use crate::type_tag::TypeDescriptor;

pub async fn run(cli: &Cli, address: &str, type_tag: &str) -> Result<()> {
	let account: AccountAddress = address.parse()?;
	let ty: TypeDescriptor = type_tag.parse()?;
	let Some(tag) = ty.as_struct() else {
		return Err(Error::InvalidArgument {
			name: "type".into(),
			reason: format!("`{ty}` is not a struct type"),
		}
		.into());
	};
	// Contract layouts are keyed by the address the struct is published at.
	let repo = contracts::contract_layouts(tag.address)?;

	let rpc = resolve_rpc(cli)?;
	match rpc.resource(account, &ty).await? {
		Some(bytes) => {
			let decoded = decoder::decode(&repo, &ty, &bytes)?;
			println!("{}", serde_json::to_string_pretty(&decoded.to_json())?);
		}
		None => println!("Resource not found: {ty} under {account}"),
	}
	Ok(())
}
