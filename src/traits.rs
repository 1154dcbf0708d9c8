//! Collaborator traits.
//!
//! The engine never talks to a node, a wallet or a key store directly. Callers
//! inject implementations of these traits: the CLI wires them to an Esplora
//! backend, tests wire them to an in-memory chain.

use bfp_support::Result;
use bitcoin::{OutPoint, ScriptBuf, Transaction, Txid};
use serde::{Deserialize, Serialize};

/// Fetches confirmed or mempool transactions by id.
///
/// Implementations own their timeout and retry policy; an error returned here
/// is treated as final.
pub trait TransactionSource {
    fn get_transaction(&self, txid: &Txid) -> Result<Transaction>;
}

/// Key holder for the chain's change outputs.
pub trait ChainSigner {
    /// Script that receives each chunk transaction's change.
    fn change_script(&self) -> Result<ScriptBuf>;

    /// Signs the single input of `tx`, which spends `input_satoshis`.
    fn sign(&mut self, tx: Transaction, input_satoshis: u64) -> Result<Transaction>;
}

pub trait Broadcaster {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid>;
}

/// Unspent outputs held by an address.
pub trait UtxoSource {
    fn get_utxos(&self, address: &str) -> Result<Vec<FundingUtxo>>;
}

impl<T: TransactionSource + ?Sized> TransactionSource for &T {
    fn get_transaction(&self, txid: &Txid) -> Result<Transaction> {
        (**self).get_transaction(txid)
    }
}

impl<T: UtxoSource + ?Sized> UtxoSource for &T {
    fn get_utxos(&self, address: &str) -> Result<Vec<FundingUtxo>> {
        (**self).get_utxos(address)
    }
}

/// The output that pays for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingUtxo {
    pub outpoint: OutPoint,
    pub satoshis: u64,
}

impl FundingUtxo {
    pub fn new(outpoint: OutPoint, satoshis: u64) -> Self {
        Self { outpoint, satoshis }
    }
}
