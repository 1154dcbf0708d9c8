use bitcoin::Txid;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BfpError {
    #[error("invalid script: {0}")]
    InvalidScript(String),

    #[error("invalid {field}: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("chain truncated at step {step} ({txid}): {reason}")]
    ChainTruncated {
        step: usize,
        txid: Txid,
        reason: String,
    },

    #[error("insufficient funds for link {link}: requires {required} sats, {available} available")]
    InsufficientFunds {
        link: usize,
        required: u64,
        available: u64,
    },

    #[error("transaction {0} is not a BFP metadata transaction")]
    NotMetadata(Txid),

    #[error("file hash mismatch: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    #[error("invalid file uri: {0}")]
    InvalidUri(String),

    #[error("collaborator error: {0}")]
    Collaborator(String),

    #[error("hex error: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("transaction decode error: {0}")]
    Consensus(#[from] bitcoin::consensus::encode::Error),
}

impl BfpError {
    pub fn field(field: &'static str, reason: impl Into<String>) -> Self {
        BfpError::FieldValidation {
            field,
            reason: reason.into(),
        }
    }

    pub fn invalid_script(reason: impl Into<String>) -> Self {
        BfpError::InvalidScript(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, BfpError>;
