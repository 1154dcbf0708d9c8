//! Turns a file into the ordered list of transactions that publish it.
//!
//! Links are produced oldest first. Every link spends the change output of the
//! link before it, so only the first one references a txid known up front;
//! the rest are resolved while publishing.

use crate::fee::miner_fee;
use crate::planner::ChunkPlan;
use crate::traits::{Broadcaster, ChainSigner, FundingUtxo};
use bfp_support::constants::{CHANGE_VOUT, DUST_SATOSHIS};
use bfp_support::script::encode;
use bfp_support::{BfpError, BfpMessage, FileMetadata, Result};
use bitcoin::{
    absolute::LockTime, transaction::Version, Amount, OutPoint, ScriptBuf, Sequence, Transaction,
    TxIn, TxOut, Txid, Witness,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Chunk,
    Metadata,
}

/// The outpoint a link spends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkInput {
    /// The upload's funding UTXO.
    Funding,
    /// The change output of an earlier link.
    PreviousChange { link: usize, vout: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLink {
    pub kind: LinkKind,
    pub script: ScriptBuf,
    pub input: LinkInput,
    pub input_satoshis: u64,
    pub miner_fee: u64,
    pub change_satoshis: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAssembly {
    pub funding: FundingUtxo,
    pub plan: ChunkPlan,
    /// Metadata as published, including any inline chunk.
    pub metadata: FileMetadata,
    pub links: Vec<TransactionLink>,
}

impl ChainAssembly {
    pub fn metadata_link(&self) -> Option<&TransactionLink> {
        self.links.last().filter(|l| l.kind == LinkKind::Metadata)
    }

    pub fn chunk_links(&self) -> impl Iterator<Item = &TransactionLink> {
        self.links.iter().filter(|l| l.kind == LinkKind::Chunk)
    }

    pub fn total_miner_fees(&self) -> u64 {
        self.links.iter().map(|l| l.miner_fee).sum()
    }

    /// Satoshis left in the metadata transaction's change output.
    pub fn final_change(&self) -> u64 {
        self.links.last().map_or(self.funding.satoshis, |l| l.change_satoshis)
    }

    /// Builds the unsigned transaction for link `index`, spending `previous`.
    pub fn unsigned_transaction(
        &self,
        index: usize,
        previous: OutPoint,
        change_script: ScriptBuf,
    ) -> Result<Transaction> {
        let link = self.links.get(index).ok_or_else(|| {
            BfpError::Collaborator(format!("no link at index {index}"))
        })?;
        Ok(Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: previous,
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![
                TxOut {
                    value: Amount::ZERO,
                    script_pubkey: link.script.clone(),
                },
                TxOut {
                    value: Amount::from_sat(link.change_satoshis),
                    script_pubkey: change_script,
                },
            ],
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChainAssembler {
    fee_rate: u64,
}

impl ChainAssembler {
    pub fn new(fee_rate: u64) -> Self {
        Self { fee_rate }
    }

    pub fn fee_rate(&self) -> u64 {
        self.fee_rate
    }

    /// The template as it will be sized: no chunk, `file_size` set to the data length.
    pub fn prepare_metadata(template: &FileMetadata, total_bytes: u64) -> FileMetadata {
        FileMetadata {
            file_size: Some(total_bytes),
            ..template.without_chunk()
        }
    }

    pub fn assemble(
        &self,
        data: &[u8],
        template: &FileMetadata,
        funding: FundingUtxo,
    ) -> Result<ChainAssembly> {
        let mut metadata = Self::prepare_metadata(template, data.len() as u64);
        let plan = ChunkPlan::new(data.len() as u64, &metadata)?;
        metadata.chunk_count = u32::try_from(plan.declared_chunk_count())
            .map_err(|_| BfpError::field("chunk_count", "too many chunks"))?;

        let mut ranges = plan.chunk_ranges();
        let inline = if plan.last_chunk_size > 0 && plan.last_chunk_fits_in_metadata {
            ranges.pop()
        } else {
            None
        };
        metadata.chunk = inline.map(|range| data[range].to_vec());

        let mut scripts = ranges
            .into_iter()
            .map(|range| Ok((LinkKind::Chunk, encode(&BfpMessage::chunk(&data[range]))?)))
            .collect::<Result<Vec<_>>>()?;
        scripts.push((
            LinkKind::Metadata,
            encode(&BfpMessage::Metadata(metadata.clone()))?,
        ));

        let mut links = Vec::with_capacity(scripts.len());
        let mut available = funding.satoshis;
        for (index, (kind, script)) in scripts.into_iter().enumerate() {
            let fee = miner_fee(script.len(), self.fee_rate)?;
            let change = available
                .checked_sub(fee)
                .ok_or(BfpError::InsufficientFunds {
                    link: index,
                    required: fee,
                    available,
                })?;
            if change < DUST_SATOSHIS {
                log::warn!("link {index} change of {change} sats is below the dust limit");
            }
            let input = match index {
                0 => LinkInput::Funding,
                n => LinkInput::PreviousChange {
                    link: n - 1,
                    vout: CHANGE_VOUT,
                },
            };
            links.push(TransactionLink {
                kind,
                script,
                input,
                input_satoshis: available,
                miner_fee: fee,
                change_satoshis: change,
            });
            available = change;
        }

        log::debug!(
            "assembled {} links for {} bytes ({} chunk transactions)",
            links.len(),
            plan.total_bytes,
            plan.chunk_transaction_count()
        );
        Ok(ChainAssembly {
            funding,
            plan,
            metadata,
            links,
        })
    }
}

/// Signs and broadcasts every link in order, returning the txids oldest first.
///
/// Chunk change goes to the signer's change script; the metadata transaction's
/// change goes to `receiver`. The last txid identifies the file.
pub fn publish<S, B>(
    assembly: &ChainAssembly,
    signer: &mut S,
    broadcaster: &B,
    receiver: &ScriptBuf,
) -> Result<Vec<Txid>>
where
    S: ChainSigner + ?Sized,
    B: Broadcaster + ?Sized,
{
    let mut txids: Vec<Txid> = Vec::with_capacity(assembly.links.len());
    for (index, link) in assembly.links.iter().enumerate() {
        let previous = match link.input {
            LinkInput::Funding => assembly.funding.outpoint,
            LinkInput::PreviousChange { link: prior, vout } => OutPoint {
                txid: *txids.get(prior).ok_or_else(|| {
                    BfpError::Collaborator(format!(
                        "link {index} spends unpublished link {prior}"
                    ))
                })?,
                vout,
            },
        };
        let change_script = match link.kind {
            LinkKind::Chunk => signer.change_script()?,
            LinkKind::Metadata => receiver.clone(),
        };
        let unsigned = assembly.unsigned_transaction(index, previous, change_script)?;
        let signed = signer.sign(unsigned, link.input_satoshis)?;
        let txid = broadcaster.broadcast(&signed)?;
        log::info!(
            "published {:?} link {}/{}: {}",
            link.kind,
            index + 1,
            assembly.links.len(),
            txid
        );
        txids.push(txid);
    }
    Ok(txids)
}
