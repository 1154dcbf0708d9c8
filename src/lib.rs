//! Bitcoin Files Protocol engine.
//!
//! Upload: [`planner::ChunkPlan`] sizes the chain, [`fee`] prices it and
//! [`assembler::ChainAssembler`] lays out the transactions, which
//! [`assembler::publish`] hands to an injected signer and broadcaster.
//!
//! Download: [`walker::ChainWalker`] follows a chain backward from its
//! metadata transaction and reassembles the file.

pub mod assembler;
pub mod fee;
pub mod funding;
pub mod integrity;
pub mod planner;
#[cfg(test)]
pub mod tests;
pub mod traits;
pub mod uri;
pub mod walker;

pub use bfp_support::{constants, script, BfpError, BfpMessage, FileMetadata, Result};

pub use assembler::{publish, ChainAssembler, ChainAssembly, LinkInput, LinkKind, TransactionLink};
pub use planner::ChunkPlan;
pub use traits::{Broadcaster, ChainSigner, FundingUtxo, TransactionSource, UtxoSource};
pub use uri::BfpUri;
pub use walker::{ChainWalker, DownloadedFile};
