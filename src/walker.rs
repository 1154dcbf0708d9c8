use crate::integrity::file_sha256;
use crate::traits::TransactionSource;
use crate::uri::BfpUri;
use bfp_support::script::decode_transaction;
use bfp_support::{BfpError, BfpMessage, FileMetadata, Result};
use bitcoin::{Transaction, Txid};

/// A reconstructed file and the metadata it was published with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub txid: Txid,
    pub metadata: FileMetadata,
    pub data: Vec<u8>,
}

impl DownloadedFile {
    /// Checks the data against the published `file_sha256`, if there is one.
    ///
    /// Returns `Ok(false)` when the metadata carries no hash.
    pub fn verify_sha256(&self) -> Result<bool> {
        let Some(expected) = self.metadata.file_sha256 else {
            return Ok(false);
        };
        let actual = file_sha256(&self.data);
        if actual != expected {
            return Err(BfpError::IntegrityMismatch {
                expected: hex::encode(expected),
                actual: hex::encode(actual),
            });
        }
        Ok(true)
    }
}

/// Downloads a file by walking its chain backward from the metadata transaction.
pub struct ChainWalker<S> {
    source: S,
}

impl<S: TransactionSource> ChainWalker<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn download(
        &self,
        txid: &Txid,
        progress: Option<&mut dyn FnMut(f64)>,
    ) -> Result<Vec<u8>> {
        Ok(self.download_file(txid, progress)?.data)
    }

    pub fn download_uri(
        &self,
        uri: &BfpUri,
        progress: Option<&mut dyn FnMut(f64)>,
    ) -> Result<DownloadedFile> {
        self.download_file(&uri.txid, progress)
    }

    pub fn download_file(
        &self,
        txid: &Txid,
        mut progress: Option<&mut dyn FnMut(f64)>,
    ) -> Result<DownloadedFile> {
        let head = self.fetch(0, txid)?;
        let metadata = match decode_transaction(&head) {
            Ok(BfpMessage::Metadata(metadata)) => metadata,
            Ok(BfpMessage::Chunk { .. }) => return Err(BfpError::NotMetadata(*txid)),
            Err(e) => return Err(e),
        };

        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut remaining = metadata.chunk_count as usize;
        if metadata.chunk_count > 0 {
            if let Some(chunk) = &metadata.chunk {
                chunks.push(chunk.clone());
                remaining -= 1;
            }
        }
        log::debug!(
            "{txid}: {} chunks declared, {remaining} to fetch",
            metadata.chunk_count
        );

        let mut cursor = head;
        let mut cursor_txid = *txid;
        for index in 0..remaining {
            let step = index + 1;
            let prev = cursor
                .input
                .first()
                .map(|input| input.previous_output.txid)
                .ok_or_else(|| BfpError::ChainTruncated {
                    step,
                    txid: cursor_txid,
                    reason: "transaction has no inputs".to_string(),
                })?;
            let tx = self.fetch(step, &prev)?;
            let data = match decode_transaction(&tx) {
                Ok(BfpMessage::Chunk { data }) => data,
                Ok(BfpMessage::Metadata(_)) => {
                    return Err(truncated(step, prev, "expected a chunk, found metadata"))
                }
                Err(e) => return Err(truncated(step, prev, e.to_string())),
            };
            chunks.push(data);
            cursor = tx;
            cursor_txid = prev;

            if let Some(callback) = progress.as_mut() {
                callback(step as f64 / remaining as f64);
            }
        }
        if remaining == 0 {
            if let Some(callback) = progress.as_mut() {
                callback(1.0);
            }
        }

        chunks.reverse();
        let data = chunks.concat();
        log::info!("downloaded {} bytes from {txid}", data.len());
        Ok(DownloadedFile {
            txid: *txid,
            metadata,
            data,
        })
    }

    fn fetch(&self, step: usize, txid: &Txid) -> Result<Transaction> {
        self.source
            .get_transaction(txid)
            .map_err(|e| truncated(step, *txid, e.to_string()))
    }
}

fn truncated(step: usize, txid: Txid, reason: impl Into<String>) -> BfpError {
    BfpError::ChainTruncated {
        step,
        txid,
        reason: reason.into(),
    }
}
