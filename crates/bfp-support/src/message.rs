use crate::constants::DIGEST_LEN;
use crate::error::Result;
use crate::utils::{digest_from_hex, hex_bytes, hex_opt_bytes, hex_opt_digest};
use serde::{Deserialize, Serialize};

/// File level attributes carried by the metadata transaction at the head of a chain.
///
/// Optional text and byte fields are either `None` or non-empty: the wire format
/// writes both as the same empty push, so encoding rejects `Some` of an empty value.
#[derive(Debug, PartialEq, Eq, Clone, Default, Serialize, Deserialize)]
pub struct FileMetadata {
    pub chunk_count: u32,
    pub file_name: Option<String>,
    pub file_ext: Option<String>,
    pub file_size: Option<u64>,
    #[serde(with = "hex_opt_digest", default)]
    pub file_sha256: Option<[u8; DIGEST_LEN]>,
    /// Hash of the previous version of this file, not of a previous chunk.
    #[serde(with = "hex_opt_digest", default)]
    pub prev_file_sha256: Option<[u8; DIGEST_LEN]>,
    pub file_uri: Option<String>,
    /// Final chunk of the file when it fits inside the metadata script.
    #[serde(with = "hex_opt_bytes", default)]
    pub chunk: Option<Vec<u8>>,
}

impl FileMetadata {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            ..Default::default()
        }
    }

    pub fn with_file_ext(mut self, ext: impl Into<String>) -> Self {
        self.file_ext = Some(ext.into());
        self
    }

    pub fn with_file_uri(mut self, uri: impl Into<String>) -> Self {
        self.file_uri = Some(uri.into());
        self
    }

    pub fn with_file_sha256_hex(mut self, hex: &str) -> Result<Self> {
        self.file_sha256 = Some(digest_from_hex("file_sha256", hex)?);
        Ok(self)
    }

    pub fn with_prev_file_sha256_hex(mut self, hex: &str) -> Result<Self> {
        self.prev_file_sha256 = Some(digest_from_hex("prev_file_sha256", hex)?);
        Ok(self)
    }

    /// Copy of this metadata with the inline chunk removed, used for sizing.
    pub fn without_chunk(&self) -> Self {
        Self {
            chunk: None,
            ..self.clone()
        }
    }
}

/// A decoded BFP OP_RETURN payload.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BfpMessage {
    Metadata(FileMetadata),
    Chunk {
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },
}

impl BfpMessage {
    pub fn chunk(data: impl Into<Vec<u8>>) -> Self {
        BfpMessage::Chunk { data: data.into() }
    }

    pub fn as_metadata(&self) -> Option<&FileMetadata> {
        match self {
            BfpMessage::Metadata(m) => Some(m),
            BfpMessage::Chunk { .. } => None,
        }
    }
}

impl From<FileMetadata> for BfpMessage {
    fn from(metadata: FileMetadata) -> Self {
        BfpMessage::Metadata(metadata)
    }
}
