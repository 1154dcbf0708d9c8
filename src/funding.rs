use crate::traits::{FundingUtxo, UtxoSource};
use bfp_support::{BfpError, Result};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentPolling {
    pub interval: Duration,
    /// Give up after this many lookups; `None` polls until paid.
    pub max_polls: Option<u64>,
}

impl Default for PaymentPolling {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_polls: None,
        }
    }
}

/// Polls `address` until it holds a UTXO worth at least `required` satoshis.
///
/// Lookup failures are logged and polling continues.
pub fn wait_for_payment<U: UtxoSource + ?Sized>(
    source: &U,
    address: &str,
    required: u64,
    polling: PaymentPolling,
) -> Result<FundingUtxo> {
    let mut polls = 0u64;
    loop {
        polls += 1;
        match source.get_utxos(address) {
            Ok(utxos) => {
                if let Some(utxo) = utxos.into_iter().find(|u| u.satoshis >= required) {
                    log::info!(
                        "payment of {} sats received at {}",
                        utxo.satoshis,
                        utxo.outpoint
                    );
                    return Ok(utxo);
                }
                log::debug!("no payment of {required} sats at {address} yet");
            }
            Err(e) => log::warn!("utxo lookup for {address} failed: {e}"),
        }
        if polling.max_polls.map_or(false, |max| polls >= max) {
            return Err(BfpError::Collaborator(format!(
                "no payment of {required} sats to {address} after {polls} polls"
            )));
        }
        thread::sleep(polling.interval);
    }
}
