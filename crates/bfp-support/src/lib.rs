//! Wire types for the Bitcoin Files Protocol (BFP).
//!
//! Files are published as a chain of transactions whose first output is an
//! OP_RETURN carrying either a file chunk or the file's metadata. This crate
//! holds the message types and the script codec; chain planning and walking
//! live in the `bfp` crate.

pub mod constants;
pub mod error;
pub mod message;
pub mod script;
pub mod utils;

pub use error::{BfpError, Result};
pub use message::{BfpMessage, FileMetadata};
