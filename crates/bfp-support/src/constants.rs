/// Protocol identifier pushed right after OP_RETURN ("BFP\0").
pub const LOKAD_ID: [u8; 4] = [0x42, 0x46, 0x50, 0x00];

/// Message type for an on-chain file.
pub const MSG_TYPE_FILE: u8 = 0x01;

/// Relay limit for a data-carrying output script.
pub const MAX_SCRIPT_LEN: usize = 223;

/// Bytes of file data carried by one chunk transaction.
pub const CHUNK_CAPACITY: usize = 220;

/// Width of the chunk count field on the wire.
pub const CHUNK_COUNT_WIDTH: usize = 1;

/// Width of the file size field on the wire.
pub const FILE_SIZE_WIDTH: usize = 2;

pub const DIGEST_LEN: usize = 32;

/// Index of the change output in every chain transaction; vout 0 is the OP_RETURN.
pub const CHANGE_VOUT: u32 = 1;

/// Dust amount passed along the chain with each change output.
pub const DUST_SATOSHIS: u64 = 546;

pub const URI_SCHEME: &str = "bitcoinfile";

pub const LEGACY_URI_SCHEME: &str = "bitcoinfiles";
