use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::address::AccountAddress;
use crate::error::{Error, Result};

/// Deepest nesting the parser accepts (`a<b<c<...>>>` counts one level per
/// type).  Anything deeper is rejected as malformed.
pub const MAX_TYPE_DEPTH: usize = 16;

/// A parsed Move type reference.
///
/// Variant order is load-bearing: serde assigns BCS variant indices by
/// declaration order and these must line up with the chain's `TypeTag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum TypeDescriptor {
	Bool,
	U8,
	U64,
	U128,
	Address,
	Signer,
	Vector(Box<TypeDescriptor>),
	Struct(Box<StructTag>),
	U16,
	U32,
	U256,
}

/// A module-qualified struct reference such as
/// `0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StructTag {
	pub address: AccountAddress,
	pub module: String,
	pub name: String,
	pub type_args: Vec<TypeDescriptor>,
}

impl StructTag {
	/// `address::module::Name` without type arguments.
	pub fn qualified_name(&self) -> String {
		format!("{}::{}::{}", self.address, self.module, self.name)
	}
}

impl TypeDescriptor {
	pub fn as_struct(&self) -> Option<&StructTag> {
		match self {
			Self::Struct(tag) => Some(tag.as_ref()),
			_ => None,
		}
	}

	/// Nested type arguments; empty for everything but structs.
	pub fn type_args(&self) -> &[TypeDescriptor] {
		match self {
			Self::Struct(tag) => &tag.type_args,
			_ => &[],
		}
	}
}

impl FromStr for TypeDescriptor {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		let tokens = tokenize(s)?;
		if tokens.is_empty() {
			return Err(Error::malformed(s, "empty input"));
		}
		let mut parser = Parser { input: s, tokens, pos: 0 };
		let ty = parser.parse_type(1)?;
		if parser.pos != parser.tokens.len() {
			return Err(Error::malformed(s, "unexpected trailing input"));
		}
		Ok(ty)
	}
}

impl fmt::Display for TypeDescriptor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Bool => f.write_str("bool"),
			Self::U8 => f.write_str("u8"),
			Self::U16 => f.write_str("u16"),
			Self::U32 => f.write_str("u32"),
			Self::U64 => f.write_str("u64"),
			Self::U128 => f.write_str("u128"),
			Self::U256 => f.write_str("u256"),
			Self::Address => f.write_str("address"),
			Self::Signer => f.write_str("signer"),
			Self::Vector(inner) => write!(f, "vector<{inner}>"),
			Self::Struct(tag) => write!(f, "{tag}"),
		}
	}
}

impl fmt::Display for StructTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.qualified_name())?;
		if let Some((first, rest)) = self.type_args.split_first() {
			write!(f, "<{first}")?;
			for arg in rest {
				write!(f, ", {arg}")?;
			}
			f.write_str(">")?;
		}
		Ok(())
	}
}

// -- Lexer --

#[derive(Debug, Clone, PartialEq)]
enum Token {
	Name(String),
	PathSep,
	Lt,
	Gt,
	Comma,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
	let mut tokens = Vec::new();
	let mut chars = input.chars().peekable();

	while let Some(&c) = chars.peek() {
		match c {
			c if c.is_whitespace() => {
				chars.next();
			}
			'<' => {
				chars.next();
				tokens.push(Token::Lt);
			}
			'>' => {
				chars.next();
				tokens.push(Token::Gt);
			}
			',' => {
				chars.next();
				tokens.push(Token::Comma);
			}
			':' => {
				chars.next();
				if chars.next() != Some(':') {
					return Err(Error::malformed(input, "expected `::`"));
				}
				tokens.push(Token::PathSep);
			}
			c if c.is_ascii_alphanumeric() || c == '_' => {
				let mut name = String::new();
				while let Some(&c) = chars.peek() {
					if !(c.is_ascii_alphanumeric() || c == '_') {
						break;
					}
					name.push(c);
					chars.next();
				}
				tokens.push(Token::Name(name));
			}
			other => {
				return Err(Error::malformed(input, format!("unexpected character `{other}`")));
			}
		}
	}

	Ok(tokens)
}

// -- Recursive-descent parser --

struct Parser<'a> {
	input: &'a str,
	tokens: Vec<Token>,
	pos: usize,
}

impl Parser<'_> {
	fn parse_type(&mut self, depth: usize) -> Result<TypeDescriptor> {
		if depth > MAX_TYPE_DEPTH {
			return Err(self.error(format!("nesting deeper than {MAX_TYPE_DEPTH} levels")));
		}

		let head = self.expect_name()?;
		let ty = match head.as_str() {
			"bool" => TypeDescriptor::Bool,
			"u8" => TypeDescriptor::U8,
			"u16" => TypeDescriptor::U16,
			"u32" => TypeDescriptor::U32,
			"u64" => TypeDescriptor::U64,
			"u128" => TypeDescriptor::U128,
			"u256" => TypeDescriptor::U256,
			"address" => TypeDescriptor::Address,
			"signer" => TypeDescriptor::Signer,
			"vector" => {
				self.expect(Token::Lt, "`<` after vector")?;
				let inner = self.parse_type(depth + 1)?;
				self.expect(Token::Gt, "closing `>`")?;
				TypeDescriptor::Vector(Box::new(inner))
			}
			_ => TypeDescriptor::Struct(Box::new(self.parse_struct(&head, depth)?)),
		};
		Ok(ty)
	}

	fn parse_struct(&mut self, address: &str, depth: usize) -> Result<StructTag> {
		if !address.starts_with("0x") {
			return Err(self.error(format!("`{address}` is not a type or a 0x address")));
		}
		let address: AccountAddress = address
			.parse()
			.map_err(|_| self.error(format!("invalid address `{address}`")))?;

		self.expect(Token::PathSep, "`::` after address")?;
		let module = self.expect_identifier()?;
		self.expect(Token::PathSep, "`::` after module")?;
		let name = self.expect_identifier()?;

		let mut type_args = Vec::new();
		if self.peek() == Some(&Token::Lt) {
			self.pos += 1;
			loop {
				type_args.push(self.parse_type(depth + 1)?);
				match self.next() {
					Some(Token::Comma) => continue,
					Some(Token::Gt) => break,
					_ => return Err(self.error("unbalanced `<`")),
				}
			}
		}

		Ok(StructTag { address, module, name, type_args })
	}

	fn expect_identifier(&mut self) -> Result<String> {
		let name = self.expect_name()?;
		let valid_start = name
			.chars()
			.next()
			.is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
		if !valid_start {
			return Err(self.error(format!("`{name}` is not a valid identifier")));
		}
		Ok(name)
	}

	fn expect_name(&mut self) -> Result<String> {
		match self.next() {
			Some(Token::Name(n)) => Ok(n),
			Some(other) => Err(self.error(format!("expected a name, found {other:?}"))),
			None => Err(self.error("unexpected end of input")),
		}
	}

	fn expect(&mut self, want: Token, what: &str) -> Result<()> {
		match self.next() {
			Some(t) if t == want => Ok(()),
			_ => Err(self.error(format!("expected {what}"))),
		}
	}

	fn peek(&self) -> Option<&Token> {
		self.tokens.get(self.pos)
	}

	fn next(&mut self) -> Option<Token> {
		let t = self.tokens.get(self.pos).cloned();
		if t.is_some() {
			self.pos += 1;
		}
		t
	}

	fn error(&self, reason: impl Into<String>) -> Error {
		Error::malformed(self.input, reason)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(s: &str) -> Result<TypeDescriptor> {
		s.parse()
	}

	fn assert_malformed(s: &str) {
		match parse(s) {
			Err(Error::MalformedTypeTag { .. }) => {}
			other => panic!("expected MalformedTypeTag for {s:?}, got {other:?}"),
		}
	}

	#[test]
	fn primitives() {
		assert_eq!(parse("u64").unwrap(), TypeDescriptor::U64);
		assert_eq!(parse("bool").unwrap(), TypeDescriptor::Bool);
		assert_eq!(parse("address").unwrap(), TypeDescriptor::Address);
		assert_eq!(
			parse("vector<u8>").unwrap(),
			TypeDescriptor::Vector(Box::new(TypeDescriptor::U8))
		);
		assert!(parse("u64").unwrap().type_args().is_empty());
	}

	#[test]
	fn plain_struct_has_no_type_args() {
		let ty = parse("0x1::aptos_coin::AptosCoin").unwrap();
		let tag = ty.as_struct().unwrap();
		assert_eq!(tag.address, AccountAddress::ONE);
		assert_eq!(tag.module, "aptos_coin");
		assert_eq!(tag.name, "AptosCoin");
		assert!(tag.type_args.is_empty());
	}

	#[test]
	fn generic_struct_has_one_type_arg() {
		let ty = parse("0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>").unwrap();
		assert_eq!(ty.type_args().len(), 1);
		assert_eq!(
			ty.type_args()[0].as_struct().unwrap().qualified_name(),
			"0x1::aptos_coin::AptosCoin"
		);
	}

	#[test]
	fn deep_nesting_and_multiple_args() {
		let ty = parse("0xabc::m::Pair<0x1::coin::Coin<0x1::m::A>, vector<0x1::m::Box<u8>>>").unwrap();
		assert_eq!(ty.type_args().len(), 2);
		assert_eq!(ty.type_args()[0].type_args().len(), 1);
	}

	#[test]
	fn canonical_form_round_trips() {
		for s in [
			"u8",
			"vector<vector<u128>>",
			"0x1::aptos_coin::AptosCoin",
			"0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>",
			"0xcafe::pool::Pool<0x1::m::A, 0x1::m::B<vector<address>>, u256>",
		] {
			let ty = parse(s).unwrap();
			assert_eq!(ty.to_string(), s);
			assert_eq!(parse(&ty.to_string()).unwrap(), ty);
		}
	}

	#[test]
	fn whitespace_and_padding_normalize() {
		let ty = parse(" 0x01 :: coin :: Coin < 0x1::aptos_coin::AptosCoin > ").unwrap();
		assert_eq!(ty.to_string(), "0x1::coin::Coin<0x1::aptos_coin::AptosCoin>");
	}

	#[test]
	fn rejects_malformed_input() {
		assert_malformed("");
		assert_malformed("   ");
		assert_malformed("Foo<Bar");
		assert_malformed("0x1::m::Foo<0x1::m::Bar");
		assert_malformed("0x1::m::Foo<>");
		assert_malformed("0x1::m::Foo>");
		assert_malformed("0x1::m::Foo<u8,>");
		assert_malformed("0x1::m");
		assert_malformed("0x1:m::Foo");
		assert_malformed("0x1::9m::Foo");
		assert_malformed("vector<u8");
		assert_malformed("u64 u64");
		assert_malformed("0x1::m::Foo$");
	}

	#[test]
	fn depth_is_bounded() {
		let ok = format!("{}u8{}", "vector<".repeat(MAX_TYPE_DEPTH - 1), ">".repeat(MAX_TYPE_DEPTH - 1));
		assert!(parse(&ok).is_ok());

		let too_deep = format!("{}u8{}", "vector<".repeat(MAX_TYPE_DEPTH), ">".repeat(MAX_TYPE_DEPTH));
		assert_malformed(&too_deep);
	}

	#[test]
	fn bcs_uses_chain_variant_indices() {
		assert_eq!(bcs::to_bytes(&TypeDescriptor::Bool).unwrap(), vec![0]);
		assert_eq!(bcs::to_bytes(&TypeDescriptor::U64).unwrap(), vec![2]);
		assert_eq!(bcs::to_bytes(&TypeDescriptor::U256).unwrap(), vec![10]);

		let coin = parse("0x1::aptos_coin::AptosCoin").unwrap();
		let bytes = bcs::to_bytes(&coin).unwrap();
		assert_eq!(bytes[0], 7);
		assert_eq!(bytes[32], 1, "address occupies bytes 1..=32");
		assert_eq!(bytes[33] as usize, "aptos_coin".len());
		assert_eq!(*bytes.last().unwrap(), 0, "empty type-arg vector");
	}
}
