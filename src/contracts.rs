use crate::address::AccountAddress;
use crate::decoder::{FieldType, StructRepository};
use crate::error::Result;
use crate::tx_builder::{ArgKind, EntryPoint};
use crate::type_tag::TypeDescriptor;

/// One operator command that calls an entry function.
pub struct EntryCommand {
	/// Command as typed on the CLI, `module:kebab-name`.
	pub name: &'static str,
	pub module: &'static str,
	pub function: &'static str,
	/// Generic parameters, in the order the function declares them.
	pub type_params: &'static [&'static str],
	/// Plain arguments after the signer, in declaration order.
	pub args: &'static [(&'static str, ArgKind)],
	pub about: &'static str,
}

impl EntryCommand {
	/// Number of CLI arguments: type parameters first, then values.
	pub fn arity(&self) -> usize {
		self.type_params.len() + self.args.len()
	}

	pub fn usage(&self) -> String {
		let types = self.type_params.iter().map(|t| format!("<TYPE_{t}>"));
		let values = self.args.iter().map(|(n, k)| format!("<{n}:{}>", k.move_type()));
		types.chain(values).collect::<Vec<_>>().join(" ")
	}

	pub fn entry_point(&self, module_address: AccountAddress) -> EntryPoint {
		EntryPoint::new(module_address, self.module, self.function)
	}
}

/// One read-only command that decodes a resource stored under the
/// module's account.
pub struct QueryCommand {
	pub name: &'static str,
	pub module: &'static str,
	/// Struct name inside `module`.
	pub resource: &'static str,
	/// Print only this field of the decoded resource.
	pub field: Option<&'static str>,
	pub about: &'static str,
}

impl QueryCommand {
	pub fn resource_type(&self, module_address: AccountAddress) -> Result<TypeDescriptor> {
		format!("{module_address}::{}::{}", self.module, self.resource).parse()
	}
}

const COIN: &[&str] = &["CoinType"];

/// Every entry-function command, one row per function.
pub static ENTRY_COMMANDS: &[EntryCommand] = &[
	EntryCommand {
		name: "lend2:admin-add-pool",
		module: "lend2",
		function: "admin_add_pool",
		type_params: COIN,
		args: &[("initial_price", ArgKind::U64)],
		about: "List a new coin pool at an initial price (admin).",
	},
	EntryCommand {
		name: "lend2:admin-init",
		module: "lend2",
		function: "admin_init",
		type_params: &[],
		args: &[],
		about: "Initialize the lending protocol (admin).",
	},
	EntryCommand {
		name: "lend2:admin-update-price",
		module: "lend2",
		function: "admin_update_price",
		type_params: COIN,
		args: &[("price", ArgKind::U64)],
		about: "Set the oracle price of a pool's coin (admin).",
	},
	EntryCommand {
		name: "lend2:borrow",
		module: "lend2",
		function: "borrow",
		type_params: COIN,
		args: &[("amount", ArgKind::U64)],
		about: "Borrow coins from a pool.",
	},
	EntryCommand {
		name: "lend2:create-fake-user1",
		module: "lend2",
		function: "create_fake_user1",
		type_params: &[],
		args: &[],
		about: "Create demo user 1.",
	},
	EntryCommand {
		name: "lend2:create-fake-user2",
		module: "lend2",
		function: "create_fake_user2",
		type_params: &[],
		args: &[],
		about: "Create demo user 2.",
	},
	EntryCommand {
		name: "lend2:create-fake-user3",
		module: "lend2",
		function: "create_fake_user3",
		type_params: &[],
		args: &[],
		about: "Create demo user 3.",
	},
	EntryCommand {
		name: "lend2:deposit",
		module: "lend2",
		function: "deposit",
		type_params: COIN,
		args: &[("amount", ArgKind::U64)],
		about: "Deposit coins into a pool.",
	},
	EntryCommand {
		name: "lend2:init-fake-pools",
		module: "lend2",
		function: "init_fake_pools",
		type_params: &[],
		args: &[],
		about: "Create the demo coin pools.",
	},
	EntryCommand {
		name: "lend2:price-drop",
		module: "lend2",
		function: "price_drop",
		type_params: &[],
		args: &[],
		about: "Simulate a price crash on the demo pools.",
	},
	EntryCommand {
		name: "lend2:repay",
		module: "lend2",
		function: "repay",
		type_params: COIN,
		args: &[("amount", ArgKind::U64)],
		about: "Repay borrowed coins.",
	},
	EntryCommand {
		name: "lend2:withdraw",
		module: "lend2",
		function: "withdraw",
		type_params: COIN,
		args: &[("amount", ArgKind::U64)],
		about: "Withdraw deposited coins.",
	},
];

/// Read-only commands.
pub static QUERY_COMMANDS: &[QueryCommand] = &[QueryCommand {
	name: "lend2:query-get-all-users",
	module: "lend2",
	resource: "LendingProtocol",
	field: Some("users"),
	about: "List every user registered with the protocol.",
}];

pub fn find_entry(name: &str) -> Option<&'static EntryCommand> {
	ENTRY_COMMANDS.iter().find(|c| c.name == name)
}

pub fn find_query(name: &str) -> Option<&'static QueryCommand> {
	QUERY_COMMANDS.iter().find(|c| c.name == name)
}

/// Framework layouts plus the contract's own resources, with the
/// contract published at `module_address`.
pub fn contract_layouts(module_address: AccountAddress) -> Result<StructRepository> {
	let mut repo = StructRepository::with_framework()?;
	repo.register(
		&format!("{module_address}::lend2::LendingProtocol"),
		0,
		vec![("users", FieldType::parse("vector<address>")?)],
	)?;
	Ok(repo)
}
