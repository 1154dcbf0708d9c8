//! `clap` command tree for the `bfp` binary.

use bfp::FileMetadata;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Publish files on Bitcoin as chains of OP_RETURN transactions, and read them back
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct BfpCommands {
    /// Esplora API URL (overrides BFP_ESPLORA_URL)
    #[arg(long, global = true)]
    pub esplora_url: Option<String>,
    /// Fee rate in sat/byte (overrides BFP_FEE_RATE)
    #[arg(long, global = true)]
    pub fee_rate: Option<u64>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Show how a file would be split into chunk transactions
    Plan {
        file: PathBuf,
        #[command(flatten)]
        metadata: MetadataArgs,
        /// Print JSON instead of a tree
        #[arg(long)]
        raw: bool,
    },
    /// Price an upload in satoshis
    Cost {
        file: PathBuf,
        #[command(flatten)]
        metadata: MetadataArgs,
        /// Wallet UTXOs gathered by the funding transaction
        #[arg(long, default_value_t = 1)]
        inputs: u64,
        #[arg(long)]
        raw: bool,
    },
    /// Encode a metadata OP_RETURN script
    EncodeMetadata {
        #[arg(long)]
        chunk_count: u32,
        #[arg(long)]
        file_size: Option<u64>,
        #[command(flatten)]
        metadata: MetadataArgs,
        /// Inline chunk, hex encoded
        #[arg(long)]
        chunk: Option<String>,
    },
    /// Encode a chunk OP_RETURN script
    EncodeChunk {
        /// Chunk bytes, hex encoded
        data: String,
    },
    /// Decode an OP_RETURN script
    Decode {
        /// Script hex
        script: String,
        #[arg(long)]
        raw: bool,
    },
    /// Lay out the unsigned transaction chain for a file
    Assemble {
        file: PathBuf,
        #[command(flatten)]
        metadata: MetadataArgs,
        /// Funding outpoint as txid:vout
        #[arg(long)]
        funding: String,
        /// Value of the funding outpoint in satoshis
        #[arg(long)]
        funding_sats: u64,
        #[arg(long)]
        raw: bool,
    },
    /// Download a file by its metadata txid or bitcoinfile: URI
    Download {
        uri: String,
        /// Write the file here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Check the data against the published sha256
        #[arg(long)]
        verify: bool,
        #[arg(long)]
        raw: bool,
    },
    /// Wait until an address receives enough to fund an upload
    WaitPayment {
        address: String,
        /// Required amount in satoshis
        amount: u64,
        #[arg(long)]
        max_polls: Option<u64>,
        #[arg(long)]
        raw: bool,
    },
}

/// Metadata fields shared by the file commands.
#[derive(Args, Debug, Clone, Default)]
pub struct MetadataArgs {
    /// File name; defaults to the input file's stem
    #[arg(long)]
    pub name: Option<String>,
    /// File extension; defaults to the input file's extension
    #[arg(long)]
    pub ext: Option<String>,
    #[arg(long)]
    pub uri: Option<String>,
    /// Hex sha256 of the file; computed from the input when omitted
    #[arg(long)]
    pub sha256: Option<String>,
    /// Hex sha256 of the previous version of the file
    #[arg(long)]
    pub prev_sha256: Option<String>,
    /// Leave the sha256 field empty
    #[arg(long, conflicts_with = "sha256")]
    pub no_hash: bool,
}

impl MetadataArgs {
    /// Builds a metadata template, falling back to `path` for name and extension.
    pub fn to_metadata(&self, path: Option<&Path>) -> bfp::Result<FileMetadata> {
        let mut metadata = FileMetadata {
            file_name: self.name.clone().or_else(|| {
                path.and_then(Path::file_stem)
                    .map(|s| s.to_string_lossy().into_owned())
            }),
            file_ext: self.ext.clone().or_else(|| {
                path.and_then(Path::extension)
                    .map(|s| s.to_string_lossy().into_owned())
            }),
            file_uri: self.uri.clone(),
            ..Default::default()
        };
        if let Some(hex) = &self.sha256 {
            metadata = metadata.with_file_sha256_hex(hex)?;
        }
        if let Some(hex) = &self.prev_sha256 {
            metadata = metadata.with_prev_file_sha256_hex(hex)?;
        }
        Ok(metadata)
    }
}
