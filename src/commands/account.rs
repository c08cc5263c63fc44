use anyhow::Result;

use crate::cli::Cli;
use crate::commands::{load_config, resolve_module_address, resolve_signer};
use crate::rpc::Endpoint;
use crate::signer::Signer;

pub async fn run(cli: &Cli) -> Result<()> {
	let config = load_config(cli)?;
	let (rpc, identity) = resolve_signer(cli, &config)?;
	let address = identity.address();
	let module = resolve_module_address(cli, address)?;

	println!("Profile:     {}", cli.profile);
	println!("Address:     {address}");
	println!("Public key:  {}", identity.public_key_hex());
	println!("Endpoint:    {}", rpc.base_url());
	println!("Modules at:  {module}");

	let chain_id = rpc.chain_id().await?;
	println!("Chain ID:    {chain_id}");
	let sequence = rpc.sequence_number(address).await?;
	println!("Sequence:    {sequence}");
	Ok(())
}
