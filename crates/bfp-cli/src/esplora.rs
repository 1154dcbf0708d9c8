//! Blocking Esplora REST client backing the engine's collaborator traits.

use crate::config::Config;
use bfp::{BfpError, Broadcaster, FundingUtxo, Result, TransactionSource, UtxoSource};
use bitcoin::consensus::{deserialize, serialize};
use bitcoin::{OutPoint, Transaction, Txid};
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct EsploraUtxo {
    txid: String,
    vout: u32,
    value: u64,
}

impl EsploraUtxo {
    fn into_funding(self) -> Result<FundingUtxo> {
        let txid = Txid::from_str(&self.txid)
            .map_err(|e| BfpError::Collaborator(format!("bad utxo txid {}: {e}", self.txid)))?;
        Ok(FundingUtxo::new(OutPoint::new(txid, self.vout), self.value))
    }
}

pub struct EsploraClient {
    client: Client,
    base_url: String,
    retries: u32,
    backoff: Duration,
}

impl EsploraClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BfpError::Collaborator(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.esplora_url.clone(),
            retries: config.fetch_retries,
            backoff: config.retry_backoff(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Runs `request` until it succeeds, doubling the pause after each failure.
    fn with_retry(
        &self,
        what: &str,
        request: impl Fn() -> reqwest::Result<Response>,
    ) -> Result<String> {
        let mut delay = self.backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = request()
                .and_then(Response::error_for_status)
                .and_then(Response::text);
            match outcome {
                Ok(body) => return Ok(body),
                Err(e) if attempt <= self.retries && is_transient(&e) => {
                    log::warn!("{what} failed (attempt {attempt}): {e}; retrying in {delay:?}");
                    thread::sleep(delay);
                    delay *= 2;
                }
                Err(e) => {
                    return Err(BfpError::Collaborator(format!(
                        "{what} failed after {attempt} attempts: {e}"
                    )))
                }
            }
        }
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    match e.status() {
        Some(status) => status.is_server_error() || status.as_u16() == 429,
        None => true,
    }
}

impl TransactionSource for EsploraClient {
    fn get_transaction(&self, txid: &Txid) -> Result<Transaction> {
        let url = self.url(&format!("/tx/{txid}/hex"));
        log::debug!("GET {url}");
        let body = self.with_retry(&format!("fetch {txid}"), || self.client.get(&url).send())?;
        let bytes = hex::decode(body.trim())?;
        Ok(deserialize(&bytes)?)
    }
}

impl Broadcaster for EsploraClient {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        let url = self.url("/tx");
        let raw = hex::encode(serialize(tx));
        let body = self.with_retry("broadcast", || {
            self.client.post(&url).body(raw.clone()).send()
        })?;
        Txid::from_str(body.trim()).map_err(|e| {
            BfpError::Collaborator(format!("unexpected broadcast response {body}: {e}"))
        })
    }
}

impl UtxoSource for EsploraClient {
    fn get_utxos(&self, address: &str) -> Result<Vec<FundingUtxo>> {
        let url = self.url(&format!("/address/{address}/utxo"));
        let body = self.with_retry(&format!("utxos for {address}"), || {
            self.client.get(&url).send()
        })?;
        parse_utxos(&body)
    }
}

fn parse_utxos(body: &str) -> Result<Vec<FundingUtxo>> {
    let utxos: Vec<EsploraUtxo> = serde_json::from_str(body)
        .map_err(|e| BfpError::Collaborator(format!("bad utxo listing: {e}")))?;
    utxos.into_iter().map(EsploraUtxo::into_funding).collect()
}
