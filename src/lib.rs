//! A streaming OpenPGP (RFC 4880) packet engine.
//!
//! Parses and serializes the OpenPGP wire format: packet tags and
//! lengths (including partial body lengths), ASCII armor with CRC-24
//! checksums, per-tag packet bodies, and the stacked reader/writer
//! filter chains that carry dearmouring, decompression and decryption
//! transparently beneath the packet parser. The cryptographic
//! primitives themselves are consumed through the [`crypto::Crypto`]
//! capability; [`crypto::DefaultCrypto`] provides a RustCrypto backed
//! default.
//!
//! The typical entry point is [`parse::parse`], which drives the
//! whole pipeline and hands one event per decoded packet to a caller
//! supplied [`parse::Handler`].

pub mod armor;
pub mod crypto;
pub mod errors;
pub mod packet;
pub mod parse;
pub mod parsing;
pub mod reader;
pub mod region;
pub mod ser;
pub mod types;
pub mod util;
pub mod writer;

pub use crate::errors::{Error, Result};
pub use crate::parse::{parse, Event, Handler, ParseConfig};
