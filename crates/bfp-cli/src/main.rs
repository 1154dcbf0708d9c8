//! BFP CLI
//!
//! Parses arguments, layers flags over environment configuration and hands the
//! work to the `bfp` library. Network access goes through [`esplora::EsploraClient`].

use anyhow::{Context, Result};
use bfp::fee::{funding_fee, upload_cost_for_plan};
use bfp::funding::{wait_for_payment, PaymentPolling};
use bfp::integrity::file_sha256;
use bfp::script::{decode_hex, encode};
use bfp::{BfpMessage, BfpUri, ChainAssembler, ChainWalker, ChunkPlan, FileMetadata, FundingUtxo};
use bitcoin::OutPoint;
use clap::Parser;
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

mod commands;
mod config;
mod esplora;
mod pretty_print;
use commands::{BfpCommands, Commands, MetadataArgs};
use config::Config;
use esplora::EsploraClient;
use pretty_print::*;

fn main() -> Result<()> {
    let args = BfpCommands::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().with_overrides(args.esplora_url.clone(), args.fee_rate);
    log::debug!("using {config:?}");

    execute_command(&config, args.command)
}

/// Reads `path` and builds its metadata template, hashing the contents unless told not to.
fn load_file(path: &Path, args: &MetadataArgs) -> Result<(Vec<u8>, FileMetadata)> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mut template = args.to_metadata(Some(path))?;
    if !args.no_hash && template.file_sha256.is_none() {
        template.file_sha256 = Some(file_sha256(&data));
    }
    Ok((data, template))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn execute_command(config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Plan { file, metadata, raw } => {
            let (data, template) = load_file(&file, &metadata)?;
            let prepared = ChainAssembler::prepare_metadata(&template, data.len() as u64);
            let plan = ChunkPlan::new(data.len() as u64, &prepared)?;
            if raw {
                print_json(&plan)?;
            } else {
                print_plan(&plan);
            }
        }
        Commands::Cost { file, metadata, inputs, raw } => {
            let (data, template) = load_file(&file, &metadata)?;
            let prepared = ChainAssembler::prepare_metadata(&template, data.len() as u64);
            let plan = ChunkPlan::new(data.len() as u64, &prepared)?;
            let upload = upload_cost_for_plan(&plan, config.fee_rate)?;
            let funding = funding_fee(inputs, config.fee_rate)?;
            let total = upload
                .checked_add(funding)
                .context("upload cost plus funding fee overflows")?;
            if raw {
                print_json(&json!({
                    "fee_rate": config.fee_rate,
                    "transactions": plan.transaction_count(),
                    "upload_cost": upload,
                    "funding_fee": funding,
                    "total": total,
                }))?;
            } else {
                print_cost(&plan, upload, funding, total, config.fee_rate);
            }
        }
        Commands::EncodeMetadata { chunk_count, file_size, metadata, chunk } => {
            let mut message = metadata.to_metadata(None)?;
            message.chunk_count = chunk_count;
            message.file_size = file_size;
            message.chunk = chunk.as_deref().map(hex::decode).transpose()?;
            let script = encode(&BfpMessage::Metadata(message))?;
            println!("{}", script.to_hex_string());
        }
        Commands::EncodeChunk { data } => {
            let script = encode(&BfpMessage::chunk(hex::decode(data.trim())?))?;
            println!("{}", script.to_hex_string());
        }
        Commands::Decode { script, raw } => {
            let message = decode_hex(script.trim())?;
            if raw {
                print_json(&message)?;
            } else {
                print_message(&message);
            }
        }
        Commands::Assemble { file, metadata, funding, funding_sats, raw } => {
            let (data, template) = load_file(&file, &metadata)?;
            let outpoint = OutPoint::from_str(&funding)
                .with_context(|| format!("invalid funding outpoint {funding}"))?;
            let assembly = ChainAssembler::new(config.fee_rate).assemble(
                &data,
                &template,
                FundingUtxo::new(outpoint, funding_sats),
            )?;
            if raw {
                print_json(&assembly)?;
            } else {
                print_assembly(&assembly);
            }
        }
        Commands::Download { uri, output, verify, raw } => {
            let uri = BfpUri::from_str(&uri)?;
            let walker = ChainWalker::new(EsploraClient::new(config)?);
            let mut report = |progress: f64| log::info!("download {:.0}%", progress * 100.0);
            let file = walker.download_uri(&uri, Some(&mut report))?;
            let verified = if verify { Some(file.verify_sha256()?) } else { None };

            match &output {
                Some(path) => fs::write(path, &file.data)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => std::io::stdout().write_all(&file.data)?,
            }
            if raw {
                let summary = json!({
                    "txid": file.txid.to_string(),
                    "metadata": file.metadata,
                    "bytes": file.data.len(),
                    "verified": verified,
                });
                eprintln!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_download(&file, verified);
            }
        }
        Commands::WaitPayment { address, amount, max_polls, raw } => {
            let client = EsploraClient::new(config)?;
            let polling = PaymentPolling {
                interval: config.poll_interval(),
                max_polls,
            };
            let utxo = wait_for_payment(&client, &address, amount, polling)?;
            if raw {
                print_json(&utxo)?;
            } else {
                print_utxo(&utxo);
            }
        }
    }
    Ok(())
}
