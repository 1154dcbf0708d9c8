use crate::traits::{Broadcaster, ChainSigner, FundingUtxo, TransactionSource};
use bfp_support::constants::CHANGE_VOUT;
use bfp_support::script::encode;
use bfp_support::{BfpError, BfpMessage, Result};
use bitcoin::blockdata::transaction::Version;
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{
    absolute::LockTime, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

/// In-memory chain that doubles as broadcaster and transaction source.
#[derive(Default)]
pub struct MockChain {
    pub transactions: RefCell<HashMap<Txid, Transaction>>,
    pub fetches: Cell<usize>,
    /// Txids that fail to fetch, as if the backend had given up on them.
    pub unavailable: RefCell<Vec<Txid>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tx: Transaction) -> Txid {
        let txid = tx.compute_txid();
        self.transactions.borrow_mut().insert(txid, tx);
        txid
    }

    /// Adds a transaction carrying `message` that spends `prev`'s change output.
    pub fn push_message(&self, prev: Txid, message: &BfpMessage) -> Result<Txid> {
        let script = encode(message)?;
        Ok(self.insert(chain_transaction(prev, script)))
    }

    pub fn make_unavailable(&self, txid: Txid) {
        self.unavailable.borrow_mut().push(txid);
    }
}

impl TransactionSource for MockChain {
    fn get_transaction(&self, txid: &Txid) -> Result<Transaction> {
        self.fetches.set(self.fetches.get() + 1);
        if self.unavailable.borrow().contains(txid) {
            return Err(BfpError::Collaborator(format!("{txid}: retries exhausted")));
        }
        self.transactions
            .borrow()
            .get(txid)
            .cloned()
            .ok_or_else(|| BfpError::Collaborator(format!("{txid}: not found")))
    }
}

impl Broadcaster for MockChain {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        Ok(self.insert(tx.clone()))
    }
}

/// Signer that stamps the spent amount into the script_sig.
#[derive(Default)]
pub struct MockSigner {
    pub signed: usize,
}

impl ChainSigner for MockSigner {
    fn change_script(&self) -> Result<ScriptBuf> {
        Ok(ScriptBuf::new_p2pkh(&bitcoin::PubkeyHash::all_zeros()))
    }

    fn sign(&mut self, mut tx: Transaction, input_satoshis: u64) -> Result<Transaction> {
        self.signed += 1;
        tx.input[0].script_sig = ScriptBuf::from_bytes(input_satoshis.to_le_bytes().to_vec());
        Ok(tx)
    }
}

pub fn chain_transaction(prev: Txid, script: ScriptBuf) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: prev,
                vout: CHANGE_VOUT,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![
            TxOut {
                value: Amount::ZERO,
                script_pubkey: script,
            },
            TxOut {
                value: Amount::from_sat(546),
                script_pubkey: ScriptBuf::new(),
            },
        ],
    }
}

pub fn funding_utxo(seed: &[u8], satoshis: u64) -> FundingUtxo {
    FundingUtxo::new(
        OutPoint {
            txid: Txid::from_raw_hash(sha256d::Hash::hash(seed)),
            vout: 0,
        },
        satoshis,
    )
}

pub fn file_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}
