//! Typed decoding of raw on-chain resources.
//!
//! BCS carries no type information, so decoding needs a layout for every
//! struct involved.  Layouts come from a [`StructRepository`] the caller
//! fills in.  The decoder can only spot bytes that do not fit the layout
//! (short input, trailing bytes, bad bool or length prefix); if the
//! on-chain struct has changed shape since the layout was written, the
//! result is meaningless and that is the caller's risk.

use std::collections::HashMap;
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::address::AccountAddress;
use crate::error::{Error, Result};
use crate::type_tag::{StructTag, TypeDescriptor};

/// Recursion bound while expanding layouts, so a struct registered as
/// containing itself cannot loop forever.
const MAX_LAYOUT_DEPTH: usize = 32;

/// A field's type as declared, possibly referring to the enclosing
/// struct's generic parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
	Type(TypeDescriptor),
	/// The n-th generic parameter of the enclosing struct.
	Param(usize),
	Vector(Box<FieldType>),
	/// A generic struct whose arguments mention parameters.
	Struct(StructTag, Vec<FieldType>),
}

impl FieldType {
	/// A concrete type written out, e.g. `"vector<address>"`.
	pub fn parse(ty: &str) -> Result<Self> {
		Ok(Self::Type(ty.parse()?))
	}

	pub fn vector(inner: FieldType) -> Self {
		Self::Vector(Box::new(inner))
	}

	/// `name` is `address::module::Name`; `args` fill its parameters.
	pub fn generic(name: &str, args: Vec<FieldType>) -> Result<Self> {
		Ok(Self::Struct(bare_struct(name)?, args))
	}

	fn instantiate(&self, args: &[TypeDescriptor]) -> Result<TypeDescriptor> {
		Ok(match self {
			Self::Type(ty) => ty.clone(),
			Self::Param(i) => args
				.get(*i)
				.cloned()
				.ok_or_else(|| Error::DecodeMismatch(format!("layout refers to missing type parameter {i}")))?,
			Self::Vector(inner) => TypeDescriptor::Vector(Box::new(inner.instantiate(args)?)),
			Self::Struct(tag, fargs) => {
				let type_args = fargs
					.iter()
					.map(|f| f.instantiate(args))
					.collect::<Result<Vec<_>>>()?;
				TypeDescriptor::Struct(Box::new(StructTag {
					type_args,
					..tag.clone()
				}))
			}
		})
	}
}

#[derive(Debug, Clone)]
struct StructDef {
	type_params: usize,
	fields: Vec<(String, FieldType)>,
}

/// Struct layouts keyed by `address::module::Name`.
#[derive(Debug, Clone, Default)]
pub struct StructRepository {
	defs: HashMap<String, StructDef>,
}

impl StructRepository {
	/// A repository that already knows the framework structs resources
	/// commonly embed.
	pub fn with_framework() -> Result<Self> {
		use TypeDescriptor as T;

		let mut repo = Self::default();
		repo.register("0x1::string::String", 0, vec![("bytes", FieldType::vector(FieldType::Type(T::U8)))])?;
		repo.register("0x1::option::Option", 1, vec![("vec", FieldType::vector(FieldType::Param(0)))])?;
		repo.register("0x1::coin::Coin", 1, vec![("value", FieldType::Type(T::U64))])?;
		repo.register(
			"0x1::guid::ID",
			0,
			vec![("creation_num", FieldType::Type(T::U64)), ("addr", FieldType::Type(T::Address))],
		)?;
		repo.register("0x1::guid::GUID", 0, vec![("id", FieldType::parse("0x1::guid::ID")?)])?;
		repo.register(
			"0x1::event::EventHandle",
			1,
			vec![("counter", FieldType::Type(T::U64)), ("guid", FieldType::parse("0x1::guid::GUID")?)],
		)?;
		repo.register(
			"0x1::coin::CoinStore",
			1,
			vec![
				("coin", FieldType::generic("0x1::coin::Coin", vec![FieldType::Param(0)])?),
				("frozen", FieldType::Type(T::Bool)),
				(
					"deposit_events",
					FieldType::parse("0x1::event::EventHandle<0x1::coin::DepositEvent>")?,
				),
				(
					"withdraw_events",
					FieldType::parse("0x1::event::EventHandle<0x1::coin::WithdrawEvent>")?,
				),
			],
		)?;
		repo.register("0x1::table::Table", 2, vec![("handle", FieldType::Type(T::Address))])?;
		Ok(repo)
	}

	/// Declare (or replace) the layout of `name`.
	pub fn register(&mut self, name: &str, type_params: usize, fields: Vec<(&str, FieldType)>) -> Result<()> {
		let key = bare_struct(name)?.qualified_name();
		let fields = fields.into_iter().map(|(n, f)| (n.to_owned(), f)).collect();
		self.defs.insert(key, StructDef { type_params, fields });
		Ok(())
	}

	pub fn contains(&self, name: &str) -> bool {
		bare_struct(name).is_ok_and(|tag| self.defs.contains_key(&tag.qualified_name()))
	}

	/// Expand `ty` into a fully concrete layout.
	fn layout(&self, ty: &TypeDescriptor, depth: usize) -> Result<Layout> {
		if depth > MAX_LAYOUT_DEPTH {
			return Err(Error::DecodeMismatch(format!(
				"layout of {ty} nests deeper than {MAX_LAYOUT_DEPTH}"
			)));
		}

		Ok(match ty {
			TypeDescriptor::Bool => Layout::Bool,
			TypeDescriptor::U8 => Layout::U8,
			TypeDescriptor::U16 => Layout::U16,
			TypeDescriptor::U32 => Layout::U32,
			TypeDescriptor::U64 => Layout::U64,
			TypeDescriptor::U128 => Layout::U128,
			TypeDescriptor::U256 => Layout::U256,
			TypeDescriptor::Address => Layout::Address,
			TypeDescriptor::Signer => {
				return Err(Error::DecodeMismatch("signer values are never stored on chain".into()));
			}
			TypeDescriptor::Vector(inner) => Layout::Vector(Box::new(self.layout(inner, depth + 1)?)),
			TypeDescriptor::Struct(tag) => {
				let name = tag.qualified_name();
				let def = self
					.defs
					.get(&name)
					.ok_or_else(|| Error::DecodeMismatch(format!("no layout registered for {name}")))?;
				if def.type_params != tag.type_args.len() {
					return Err(Error::DecodeMismatch(format!(
						"{name} takes {} type argument(s), got {}",
						def.type_params,
						tag.type_args.len()
					)));
				}
				let fields = def
					.fields
					.iter()
					.map(|(n, f)| -> Result<(String, Layout)> {
						let field_ty = f.instantiate(&tag.type_args)?;
						Ok((n.clone(), self.layout(&field_ty, depth + 1)?))
					})
					.collect::<Result<Vec<_>>>()?;
				Layout::Struct {
					tag: (**tag).clone(),
					fields,
				}
			}
		})
	}
}

/// A decoded resource: its type plus the value tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedResource {
	pub type_tag: TypeDescriptor,
	pub value: MoveValue,
}

impl DecodedResource {
	pub fn to_json(&self) -> Value {
		json!({
			"type": self.type_tag.to_string(),
			"data": self.value.to_json(),
		})
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum MoveValue {
	Bool(bool),
	U8(u8),
	U16(u16),
	U32(u32),
	U64(u64),
	U128(u128),
	/// Little-endian, as stored.
	U256([u8; 32]),
	Address(AccountAddress),
	Vector(Vec<MoveValue>),
	Struct {
		tag: StructTag,
		fields: Vec<(String, MoveValue)>,
	},
}

impl MoveValue {
	/// Field lookup on a struct value.
	pub fn field(&self, name: &str) -> Option<&MoveValue> {
		match self {
			Self::Struct { fields, .. } => fields.iter().find(|(n, _)| n == name).map(|(_, v)| v),
			_ => None,
		}
	}

	/// JSON in the style of the node API: 64-bit and wider integers as
	/// strings, byte vectors as hex, `0x1::string::String` as text.
	pub fn to_json(&self) -> Value {
		match self {
			Self::Bool(b) => json!(b),
			Self::U8(n) => json!(n),
			Self::U16(n) => json!(n),
			Self::U32(n) => json!(n),
			Self::U64(n) => json!(n.to_string()),
			Self::U128(n) => json!(n.to_string()),
			Self::U256(le) => {
				let mut be = *le;
				be.reverse();
				json!(format!("0x{}", hex::encode(be)))
			}
			Self::Address(a) => json!(a.to_string()),
			Self::Vector(items) => match as_bytes(items) {
				Some(bytes) if !bytes.is_empty() => json!(format!("0x{}", hex::encode(bytes))),
				_ => Value::Array(items.iter().map(Self::to_json).collect()),
			},
			Self::Struct { tag, fields } => {
				if tag.address == AccountAddress::ONE && tag.module == "string" && tag.name == "String" {
					if let Some(Self::Vector(items)) = self.field("bytes") {
						if let Some(bytes) = as_bytes(items) {
							return json!(String::from_utf8_lossy(&bytes));
						}
					}
				}
				let map: Map<String, Value> = fields.iter().map(|(n, v)| (n.clone(), v.to_json())).collect();
				Value::Object(map)
			}
		}
	}
}

/// Decode `bytes` as a value of type `ty`.
pub fn decode(repo: &StructRepository, ty: &TypeDescriptor, bytes: &[u8]) -> Result<DecodedResource> {
	let layout = repo.layout(ty, 0)?;
	let value = bcs::from_bytes_seed(LayoutSeed(&layout), bytes)
		.map_err(|e| Error::DecodeMismatch(format!("{ty}: {e}")))?;
	Ok(DecodedResource {
		type_tag: ty.clone(),
		value,
	})
}

// -- Layout-driven deserialization --

#[derive(Debug, Clone)]
enum Layout {
	Bool,
	U8,
	U16,
	U32,
	U64,
	U128,
	U256,
	Address,
	Vector(Box<Layout>),
	Struct {
		tag: StructTag,
		fields: Vec<(String, Layout)>,
	},
}

struct LayoutSeed<'a>(&'a Layout);

impl<'de> DeserializeSeed<'de> for LayoutSeed<'_> {
	type Value = MoveValue;

	fn deserialize<D: Deserializer<'de>>(self, d: D) -> std::result::Result<MoveValue, D::Error> {
		match self.0 {
			Layout::Bool => bool::deserialize(d).map(MoveValue::Bool),
			Layout::U8 => u8::deserialize(d).map(MoveValue::U8),
			Layout::U16 => u16::deserialize(d).map(MoveValue::U16),
			Layout::U32 => u32::deserialize(d).map(MoveValue::U32),
			Layout::U64 => u64::deserialize(d).map(MoveValue::U64),
			Layout::U128 => u128::deserialize(d).map(MoveValue::U128),
			Layout::U256 => <[u8; 32]>::deserialize(d).map(MoveValue::U256),
			Layout::Address => AccountAddress::deserialize(d).map(MoveValue::Address),
			Layout::Vector(inner) => d.deserialize_seq(VectorVisitor(inner)),
			Layout::Struct { tag, fields } => d.deserialize_tuple(fields.len(), StructVisitor { tag, fields }),
		}
	}
}

struct VectorVisitor<'a>(&'a Layout);

impl<'de> Visitor<'de> for VectorVisitor<'_> {
	type Value = MoveValue;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("a vector")
	}

	fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<MoveValue, A::Error> {
		// The length prefix is untrusted; do not preallocate from it blindly.
		let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
		while let Some(item) = seq.next_element_seed(LayoutSeed(self.0))? {
			items.push(item);
		}
		Ok(MoveValue::Vector(items))
	}
}

struct StructVisitor<'a> {
	tag: &'a StructTag,
	fields: &'a [(String, Layout)],
}

impl<'de> Visitor<'de> for StructVisitor<'_> {
	type Value = MoveValue;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "struct {} with {} field(s)", self.tag, self.fields.len())
	}

	fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<MoveValue, A::Error> {
		let mut values = Vec::with_capacity(self.fields.len());
		for (i, (name, layout)) in self.fields.iter().enumerate() {
			let value = seq
				.next_element_seed(LayoutSeed(layout))?
				.ok_or_else(|| <A::Error as de::Error>::invalid_length(i, &self))?;
			values.push((name.clone(), value));
		}
		Ok(MoveValue::Struct {
			tag: self.tag.clone(),
			fields: values,
		})
	}
}

// -- Helpers --

fn bare_struct(name: &str) -> Result<StructTag> {
	match name.parse::<TypeDescriptor>()? {
		TypeDescriptor::Struct(tag) if tag.type_args.is_empty() => Ok(*tag),
		_ => Err(Error::malformed(name, "expected a struct name without type arguments")),
	}
}

/// `Some` when every element is a `u8` (vacuously so for an empty vector).
fn as_bytes(items: &[MoveValue]) -> Option<Vec<u8>> {
	items
		.iter()
		.map(|v| match v {
			MoveValue::U8(b) => Some(*b),
			_ => None,
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn repo() -> StructRepository {
		StructRepository::with_framework().unwrap()
	}

	fn ty(s: &str) -> TypeDescriptor {
		s.parse().unwrap()
	}

	fn assert_mismatch(r: Result<DecodedResource>) {
		assert!(matches!(r, Err(Error::DecodeMismatch(_))), "expected DecodeMismatch, got {r:?}");
	}

	/// Bytes of a `CoinStore` with the given balance.
	fn coin_store_bytes(value: u64) -> Vec<u8> {
		let owner = [7u8; 32];
		let handle = |creation_num: u64| (3u64, (creation_num, owner));
		bcs::to_bytes(&(value, false, handle(2), handle(3))).unwrap()
	}

	#[test]
	fn primitive_u64() {
		let d = decode(&repo(), &TypeDescriptor::U64, &42u64.to_le_bytes()).unwrap();
		assert_eq!(d.value, MoveValue::U64(42));
		assert_eq!(d.value.to_json(), json!("42"));
	}

	#[test]
	fn short_input_is_a_mismatch_not_a_truncation() {
		assert_mismatch(decode(&repo(), &TypeDescriptor::U64, &[1, 2, 3, 4, 5, 6, 7]));
		assert_mismatch(decode(&repo(), &TypeDescriptor::Address, &[0u8; 31]));
		assert_mismatch(decode(&repo(), &TypeDescriptor::U8, &[]));

		let full = coin_store_bytes(500);
		let t = ty("0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>");
		assert_mismatch(decode(&repo(), &t, &full[..full.len() - 1]));
	}

	#[test]
	fn trailing_bytes_are_a_mismatch() {
		assert_mismatch(decode(&repo(), &TypeDescriptor::U8, &[1, 2]));
	}

	#[test]
	fn bad_bool_byte_is_a_mismatch() {
		assert_mismatch(decode(&repo(), &TypeDescriptor::Bool, &[2]));
	}

	#[test]
	fn coin_store_decodes() {
		let t = ty("0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>");
		let d = decode(&repo(), &t, &coin_store_bytes(500)).unwrap();

		let coin = d.value.field("coin").unwrap();
		assert_eq!(coin.field("value"), Some(&MoveValue::U64(500)));
		assert_eq!(d.value.field("frozen"), Some(&MoveValue::Bool(false)));

		let j = d.to_json();
		assert_eq!(j["type"], json!("0x1::coin::CoinStore<0x1::aptos_coin::AptosCoin>"));
		assert_eq!(j["data"]["coin"]["value"], json!("500"));
		assert_eq!(j["data"]["deposit_events"]["guid"]["id"]["creation_num"], json!("2"));
		assert_eq!(
			j["data"]["withdraw_events"]["guid"]["id"]["addr"],
			json!(AccountAddress::new([7; 32]).to_string())
		);
	}

	#[test]
	fn vectors_and_strings() {
		let addrs = bcs::to_bytes(&vec![AccountAddress::ONE, AccountAddress::new([9; 32])]).unwrap();
		let d = decode(&repo(), &ty("vector<address>"), &addrs).unwrap();
		assert_eq!(d.value.to_json()[0], json!("0x1"));

		let s = bcs::to_bytes(&"lend2").unwrap();
		let d = decode(&repo(), &ty("0x1::string::String"), &s).unwrap();
		assert_eq!(d.value.to_json(), json!("lend2"));

		let empty = decode(&repo(), &ty("0x1::string::String"), &[0]).unwrap();
		assert_eq!(empty.value.to_json(), json!(""));

		let bytes = decode(&repo(), &ty("vector<u8>"), &[2, 0xbe, 0xef]).unwrap();
		assert_eq!(bytes.value.to_json(), json!("0xbeef"));
	}

	#[test]
	fn length_prefix_past_end_is_a_mismatch() {
		// Claims five addresses, carries one.
		let mut bytes = vec![5u8];
		bytes.extend_from_slice(&[1u8; 32]);
		assert_mismatch(decode(&repo(), &ty("vector<address>"), &bytes));
	}

	#[test]
	fn option_uses_its_parameter() {
		let t = ty("0x1::option::Option<u64>");
		let none = decode(&repo(), &t, &[0]).unwrap();
		assert_eq!(none.value.to_json(), json!({ "vec": [] }));

		let mut some = vec![1u8];
		some.extend_from_slice(&9u64.to_le_bytes());
		let some = decode(&repo(), &t, &some).unwrap();
		assert_eq!(some.value.to_json(), json!({ "vec": ["9"] }));
	}

	#[test]
	fn unknown_struct_and_wrong_arity_are_mismatches() {
		assert_mismatch(decode(&repo(), &ty("0xcafe::lend2::Nope"), &[0]));
		assert_mismatch(decode(&repo(), &ty("0x1::coin::Coin"), &[0; 8]));
		assert_mismatch(decode(&repo(), &ty("0x1::coin::Coin<u8, u8>"), &[0; 8]));
		assert_mismatch(decode(&repo(), &TypeDescriptor::Signer, &[0; 32]));
	}

	#[test]
	fn self_referential_layout_is_bounded() {
		let mut r = repo();
		r.register("0xcafe::m::Loop", 0, vec![("next", FieldType::parse("0xcafe::m::Loop").unwrap())])
			.unwrap();
		assert_mismatch(decode(&r, &ty("0xcafe::m::Loop"), &[0]));
	}

	#[test]
	fn registration_normalizes_names() {
		let mut r = StructRepository::default();
		r.register("0x0001::m::S", 0, vec![("x", FieldType::Type(TypeDescriptor::U8))]).unwrap();
		assert!(r.contains("0x1::m::S"));
		assert!(r.register("0x1::m::S<u8>", 0, vec![]).is_err());
		assert!(r.register("u8", 0, vec![]).is_err());
	}
}
