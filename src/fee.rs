//! Byte accounting for chain transactions.
//!
//! Fee rates are integer satoshis per byte.

use crate::planner::ChunkPlan;
use bfp_support::constants::DUST_SATOSHIS;
use bfp_support::{BfpError, FileMetadata, Result};

pub const P2PKH_INPUT_BYTES: u64 = 148;
pub const P2PKH_OUTPUT_BYTES: u64 = 34;
pub const TX_OVERHEAD_BYTES: u64 = 10;

/// Serialized width of a zero value output's amount and script length.
pub const OP_RETURN_AMOUNT_BYTES: u64 = 10;

/// Per transaction input reference bytes in the upload estimate.
const UPLOAD_INPUT_BYTES: u64 = 35;
/// Per transaction signature and output bytes in the upload estimate.
const UPLOAD_SIG_OUTPUT_BYTES: u64 = 148 + 1;
const CHUNK_PUSH_OPCODE_BYTES: u64 = 3;
const EXTRA_CHUNK_OPCODE_BYTES: u64 = 16;
const UNACCOUNTED_BYTES_PER_TX: u64 = 22;

/// Size of a P2PKH transaction with the given number of inputs and outputs.
pub fn p2pkh_byte_count(inputs: u64, outputs: u64) -> u64 {
    TX_OVERHEAD_BYTES + inputs * P2PKH_INPUT_BYTES + outputs * P2PKH_OUTPUT_BYTES
}

/// `bytes * fee_rate`, failing instead of wrapping.
fn at_rate(bytes: u64, fee_rate: u64) -> Result<u64> {
    bytes.checked_mul(fee_rate).ok_or_else(|| {
        BfpError::field(
            "fee_rate",
            format!("{fee_rate} sat/byte overflows the fee for {bytes} bytes"),
        )
    })
}

fn plus_dust(fee: u64) -> Result<u64> {
    fee.checked_add(DUST_SATOSHIS)
        .ok_or_else(|| BfpError::field("fee_rate", format!("fee of {fee} sats overflows")))
}

/// Miner fee for a one-in one-out chain transaction carrying `script_len` bytes of OP_RETURN.
pub fn miner_fee(script_len: usize, fee_rate: u64) -> Result<u64> {
    at_rate(
        p2pkh_byte_count(1, 1) + script_len as u64 + OP_RETURN_AMOUNT_BYTES,
        fee_rate,
    )
}

/// Miner fee plus the dust carried in the change output.
pub fn transaction_cost(script_len: usize, fee_rate: u64) -> Result<u64> {
    plus_dust(miner_fee(script_len, fee_rate)?)
}

/// Fee for the transaction that gathers `input_count` wallet UTXOs into the upload's funding output.
pub fn funding_fee(input_count: u64, fee_rate: u64) -> Result<u64> {
    let bytes = input_count
        .checked_mul(P2PKH_INPUT_BYTES)
        .and_then(|b| b.checked_add(TX_OVERHEAD_BYTES + P2PKH_OUTPUT_BYTES))
        .ok_or_else(|| BfpError::field("input_count", format!("{input_count} inputs overflow")))?;
    at_rate(bytes, fee_rate)
}

/// Total satoshis that must be sent to fund publishing a `total_bytes` file.
pub fn upload_cost(total_bytes: u64, template: &FileMetadata, fee_rate: u64) -> Result<u64> {
    let plan = ChunkPlan::new(total_bytes, template)?;
    upload_cost_for_plan(&plan, fee_rate)
}

pub fn upload_cost_for_plan(plan: &ChunkPlan, fee_rate: u64) -> Result<u64> {
    let whole = plan.whole_chunk_count;

    let mut byte_count = plan.total_bytes;
    byte_count += plan.metadata_script_len as u64;

    // final transaction's input and output
    byte_count += UPLOAD_INPUT_BYTES;
    byte_count += UPLOAD_SIG_OUTPUT_BYTES;

    byte_count += (whole + 1) * CHUNK_PUSH_OPCODE_BYTES;

    if !plan.last_chunk_fits_in_metadata {
        byte_count += UPLOAD_SIG_OUTPUT_BYTES + UPLOAD_INPUT_BYTES;
        byte_count += EXTRA_CHUNK_OPCODE_BYTES;
    }

    byte_count += UPLOAD_INPUT_BYTES * whole;
    byte_count += UPLOAD_SIG_OUTPUT_BYTES * whole;
    byte_count += UNACCOUNTED_BYTES_PER_TX * (whole + 1);

    plus_dust(at_rate(byte_count, fee_rate)?)
}
