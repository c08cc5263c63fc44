pub mod account;
pub mod invoke;
pub mod list;
pub mod query;
pub mod resource;
pub mod tx;

use anyhow::{Context, Result};

use crate::address::AccountAddress;
use crate::cli::{Cli, Command};
use crate::config::{normalize_rest_url, present, Config};
use crate::error::Error;
use crate::rpc::RestClient;
use crate::signer::{Signer, SigningIdentity};

pub async fn run(cli: &Cli) -> Result<()> {
	match &cli.command {
		Command::List => list::run(),
		Command::Account => account::run(cli).await,
		Command::Tx { command } => tx::run(cli, command).await,
		Command::Resource { address, type_tag } => resource::run(cli, address, type_tag).await,
		Command::Call(argv) => invoke::run(cli, argv).await,
	}
}

/// Load the profiles file from `--config` or the default locations.
pub fn load_config(cli: &Cli) -> Result<Config> {
	let path = Config::locate(cli.config.as_deref())?;
	tracing::debug!(path = %path.display(), "loading config");
	Config::load(&path).with_context(|| format!("loading {}", path.display()))
}

/// Resolve the REST endpoint and signing identity of the active profile.
/// `--url` overrides the profile's endpoint.
pub fn resolve_signer(cli: &Cli, config: &Config) -> Result<(RestClient, SigningIdentity)> {
	let (url, identity) = config.resolve(&cli.profile)?;
	let url = match &cli.url {
		Some(u) => normalize_rest_url(u),
		None => url,
	};
	tracing::debug!(profile = %cli.profile, %url, address = %identity.address(), "resolved profile");
	Ok((RestClient::new(&url), identity))
}

/// Endpoint for read-only commands.  A config file is only needed when
/// `--url` is absent, and the profile needs no key.
pub fn resolve_rpc(cli: &Cli) -> Result<RestClient> {
	if let Some(url) = &cli.url {
		return Ok(RestClient::new(&normalize_rest_url(url)));
	}
	let config = load_config(cli)?;
	let profile = config.profile(&cli.profile)?;
	let url = present(&profile.rest_url).ok_or_else(|| Error::MissingField {
		profile: cli.profile.clone(),
		field: "rest_url",
	})?;
	Ok(RestClient::new(&normalize_rest_url(url)))
}

/// `--module-address` if given, else the signer's own account.
pub fn resolve_module_address(cli: &Cli, signer: AccountAddress) -> Result<AccountAddress> {
	match &cli.module_address {
		Some(addr) => Ok(addr.parse()?),
		None => Ok(signer),
	}
}
