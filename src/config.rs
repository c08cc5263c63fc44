use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::address::AccountAddress;
use crate::error::{Error, Result};
use crate::signer::SigningIdentity;

/// Profiles file in the layout written by `aptos init`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
	#[serde(default)]
	pub profiles: Option<BTreeMap<String, Profile>>,
}

/// One named profile.  Fields this tool does not read are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
	pub rest_url: Option<String>,
	pub private_key: Option<String>,
	pub public_key: Option<String>,
	pub account: Option<String>,
}

impl Config {
	/// Config file relative to the working directory.
	pub fn local_path() -> PathBuf {
		PathBuf::from(".aptos").join("config.yaml")
	}

	/// Global config file (~/.aptos/config.yaml).
	pub fn global_path() -> Option<PathBuf> {
		dirs::home_dir().map(|home| home.join(".aptos").join("config.yaml"))
	}

	/// Pick the config file: explicit path first, then the working
	/// directory, then the home directory.
	pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
		if let Some(path) = explicit {
			return Ok(path.to_owned());
		}
		let local = Self::local_path();
		if local.exists() {
			return Ok(local);
		}
		match Self::global_path() {
			Some(global) if global.exists() => Ok(global),
			_ => Err(Error::Config(
				"no config file found; pass --config or run `aptos init`".into(),
			)),
		}
	}

	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
		Self::from_yaml(&content)
	}

	pub fn from_yaml(content: &str) -> Result<Self> {
		serde_yaml::from_str(content).map_err(|e| Error::Config(format!("invalid YAML: {e}")))
	}

	pub fn profile(&self, name: &str) -> Result<&Profile> {
		self.profiles
			.as_ref()
			.and_then(|p| p.get(name))
			.ok_or_else(|| Error::ProfileNotFound(name.to_owned()))
	}

	/// Resolve a profile into its REST endpoint and signing identity.
	pub fn resolve(&self, name: &str) -> Result<(String, SigningIdentity)> {
		let profile = self.profile(name)?;
		let missing = |field| Error::MissingField {
			profile: name.to_owned(),
			field,
		};

		let url = present(&profile.rest_url).ok_or_else(|| missing("rest_url"))?;
		let key = present(&profile.private_key).ok_or_else(|| missing("private_key"))?;

		let mut identity = SigningIdentity::from_private_key(key)?;
		if let Some(account) = present(&profile.account) {
			let account: AccountAddress = account.parse()?;
			if account != identity.derived_address() {
				tracing::debug!(%account, "profile account differs from key; using profile account");
			}
			identity = identity.with_address(account);
		}

		Ok((normalize_rest_url(url), identity))
	}
}

/// A profile field that is set to something other than blanks.
pub fn present(field: &Option<String>) -> Option<&str> {
	field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Trim trailing slashes and make sure the URL points at the v1 API root.
pub fn normalize_rest_url(url: &str) -> String {
	let trimmed = url.trim().trim_end_matches('/');
	if trimmed.ends_with("/v1") {
		trimmed.to_owned()
	} else {
		format!("{trimmed}/v1")
	}
}
