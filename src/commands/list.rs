use anyhow::Result;

use crate::contracts::{ENTRY_COMMANDS, QUERY_COMMANDS};

pub fn run() -> Result<()> {
	print!("{}", render());
	Ok(())
}

fn render() -> String {
	let mut out = String::from("Entry functions:\n");
	for cmd in ENTRY_COMMANDS {
		let line = format!("  {} {}", cmd.name, cmd.usage());
		out.push_str(line.trim_end());
		out.push('\n');
		out.push_str(&format!("      {}\n", cmd.about));
	}
	out.push_str("\nQueries:\n");
	for q in QUERY_COMMANDS {
		out.push_str(&format!("  {}\n      {}\n", q.name, q.about));
	}
	out
}
