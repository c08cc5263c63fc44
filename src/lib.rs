pub mod address;
pub mod cli;
pub mod commands;
pub mod config;
pub mod contracts;
pub mod decoder;
pub mod error;
pub mod rpc;
pub mod signer;
pub mod submitter;
pub mod tx_builder;
pub mod type_tag;

pub use error::{Error, Result};
