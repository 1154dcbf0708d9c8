//! Human-readable output for the `bfp` binary.

use bfp::{
    BfpMessage, ChainAssembly, ChunkPlan, DownloadedFile, FileMetadata, FundingUtxo, LinkInput,
};
use colored::*;
use termtree::Tree;

fn leaf(label: &str, value: impl std::fmt::Display) -> Tree<String> {
    Tree::new(format!("{} {}", label.bold(), value))
}

fn opt<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map_or_else(|| "-".dimmed().to_string(), |v| v.to_string())
}

fn metadata_tree(title: String, metadata: &FileMetadata) -> Tree<String> {
    let mut tree = Tree::new(title);
    tree.push(leaf("Chunk count:", metadata.chunk_count));
    tree.push(leaf("Name:", opt(&metadata.file_name)));
    tree.push(leaf("Extension:", opt(&metadata.file_ext)));
    tree.push(leaf("Size (bytes):", opt(&metadata.file_size)));
    tree.push(leaf("SHA-256:", opt(&metadata.file_sha256.map(hex::encode))));
    tree.push(leaf(
        "Previous SHA-256:",
        opt(&metadata.prev_file_sha256.map(hex::encode)),
    ));
    tree.push(leaf("URI:", opt(&metadata.file_uri)));
    if let Some(chunk) = &metadata.chunk {
        tree.push(leaf("Inline chunk (bytes):", chunk.len()));
    }
    tree
}

pub fn print_plan(plan: &ChunkPlan) {
    let mut root = Tree::new("📦 Chunk Plan".to_string());
    root.push(leaf("Total bytes:", plan.total_bytes));
    root.push(leaf("Whole chunks:", plan.whole_chunk_count));
    root.push(leaf("Last chunk (bytes):", plan.last_chunk_size));
    root.push(leaf("Metadata script (bytes):", plan.metadata_script_len));
    root.push(leaf(
        "Last chunk inline:",
        if plan.last_chunk_fits_in_metadata { "yes".green() } else { "no".yellow() },
    ));
    root.push(leaf("Transactions:", plan.transaction_count()));
    println!("{}", root);
}

pub fn print_cost(plan: &ChunkPlan, upload: u64, funding: u64, total: u64, fee_rate: u64) {
    let mut root = Tree::new(format!("💰 Upload Cost @ {fee_rate} sat/byte"));
    root.push(leaf("Transactions:", plan.transaction_count()));
    root.push(leaf("Upload (sats):", upload.to_string().green()));
    root.push(leaf("Funding transaction fee (sats):", funding));
    root.push(leaf("Total to send (sats):", total.to_string().bold()));
    println!("{}", root);
}

pub fn print_message(message: &BfpMessage) {
    match message {
        BfpMessage::Metadata(metadata) => {
            println!("{}", metadata_tree("📄 File Metadata".to_string(), metadata));
        }
        BfpMessage::Chunk { data } => {
            let mut root = Tree::new("🧩 Chunk".to_string());
            root.push(leaf("Length:", data.len()));
            root.push(leaf("Data:", hex::encode(data)));
            println!("{}", root);
        }
    }
}

pub fn print_assembly(assembly: &ChainAssembly) {
    let mut links = Vec::new();
    for (index, link) in assembly.links.iter().enumerate() {
        let mut tree = Tree::new(format!("{} {:?}", format!("#{index}").bold(), link.kind));
        let spends = match link.input {
            LinkInput::Funding => format_funding(&assembly.funding),
            LinkInput::PreviousChange { link, vout } => format!("link #{link} output {vout}"),
        };
        tree.push(leaf("Spends:", spends));
        tree.push(leaf("Input (sats):", link.input_satoshis));
        tree.push(leaf("Miner fee (sats):", link.miner_fee));
        tree.push(leaf("Change (sats):", link.change_satoshis));
        tree.push(leaf("Script:", link.script.to_hex_string()));
        links.push(tree);
    }
    let mut root = Tree::new("⛓️  Transaction Chain".to_string());
    root.push(metadata_tree("Metadata".to_string(), &assembly.metadata));
    root.push(Tree::new("Links".to_string()).with_leaves(links));
    root.push(leaf("Total miner fees (sats):", assembly.total_miner_fees()));
    root.push(leaf("Final change (sats):", assembly.final_change()));
    println!("{}", root);
}

fn format_funding(funding: &FundingUtxo) -> String {
    format!("{} ({} sats)", funding.outpoint, funding.satoshis)
}

/// Goes to stderr so file bytes can be piped from stdout.
pub fn print_download(file: &DownloadedFile, verified: Option<bool>) {
    let mut root = metadata_tree(format!("📥 {}", file.txid), &file.metadata);
    root.push(leaf("Downloaded (bytes):", file.data.len()));
    let status = match verified {
        Some(true) => "verified".green(),
        Some(false) => "no hash published".yellow(),
        None => "not checked".dimmed(),
    };
    root.push(leaf("Integrity:", status));
    eprintln!("{}", root);
}

pub fn print_utxo(utxo: &FundingUtxo) {
    let mut root = Tree::new("✅ Payment Received".to_string());
    root.push(leaf("Outpoint:", utxo.outpoint));
    root.push(leaf("Amount (sats):", utxo.satoshis));
    println!("{}", root);
}
