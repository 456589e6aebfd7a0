//! # MPT CLI
//!
//! Command-line interface for the Merkle Patricia Trie.
//!
//! Usage:
//!   mpt demo
//!   mpt root <VALUE_HEX>...
//!   mpt prove --entry <KEY_HEX=VALUE_HEX>... --key <KEY_HEX> [--out proof.json]
//!   mpt verify --root <HASH_HEX> --key <KEY_HEX> --proof proof.json
//!   mpt walk --entry <KEY_HEX=VALUE_HEX>... [--leaves N]
//!
//! Examples:
//!   mpt root 0x61 0x62 0x63
//!   mpt prove -e 0x80=0x61 -e 0x01=0x62 -k 0x01 -o proof.json
//!   RUST_LOG=mpt_trie=trace mpt walk -e 0xabcd01=0x01 -e 0xabcd12=0x02

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mpt_trie::{render, verify, Proof, Trie, B256};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mpt")]
#[command(author, version, about = "Merkle Patricia Trie roots and proofs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, env = "MPT_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the four-entry example trie, prove one key and walk it
    Demo,
    /// Compute the root of a trie keyed by position (transaction/receipt layout)
    Root {
        /// Values in order, hex encoded
        #[arg(required = true)]
        values: Vec<HexBytes>,
    },
    /// Build a trie and print the proof for one key
    Prove {
        /// Trie entries as KEY_HEX=VALUE_HEX
        #[arg(short, long = "entry", required = true)]
        entries: Vec<Entry>,

        /// Key to prove, hex encoded
        #[arg(short, long)]
        key: HexBytes,

        /// Write the proof JSON here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Verify a proof file against a root hash
    Verify {
        /// Claimed root hash, hex encoded
        #[arg(short, long, value_parser = parse_root)]
        root: B256,

        /// Key to look up, hex encoded
        #[arg(short, long)]
        key: HexBytes,

        /// Proof JSON as written by `mpt prove`
        #[arg(short, long)]
        proof: PathBuf,
    },
    /// Print the trie structure
    Walk {
        /// Trie entries as KEY_HEX=VALUE_HEX
        #[arg(short, long = "entry", required = true)]
        entries: Vec<Entry>,

        /// Stop after this many leaves
        #[arg(short, long, default_value = "16")]
        leaves: usize,
    },
}

/// Hex argument, with or without a `0x` prefix.
#[derive(Debug, Clone)]
struct HexBytes(Vec<u8>);

impl FromStr for HexBytes {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(digits)
            .map(HexBytes)
            .map_err(|e| format!("invalid hex '{}': {}", s, e))
    }
}

/// A `KEY_HEX=VALUE_HEX` trie entry.
#[derive(Debug, Clone)]
struct Entry {
    key: Vec<u8>,
    value: Vec<u8>,
}

impl FromStr for Entry {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected KEY_HEX=VALUE_HEX, got '{}'", s))?;
        Ok(Entry {
            key: key.parse::<HexBytes>()?.0,
            value: value.parse::<HexBytes>()?.0,
        })
    }
}

fn parse_root(s: &str) -> std::result::Result<B256, String> {
    let HexBytes(bytes) = s.parse()?;
    if bytes.len() != 32 {
        return Err(format!("root must be 32 bytes, got {}", bytes.len()));
    }
    Ok(B256::from_slice(&bytes))
}

fn build(entries: &[Entry]) -> Trie {
    let mut trie = Trie::new();
    for entry in entries {
        trie.put(&entry.key, entry.value.clone());
    }
    info!(entries = entries.len(), root = %trie.hash(), "built trie");
    trie
}

fn run_demo() -> Result<()> {
    let spacer = "-".repeat(10);
    println!("{spacer} Yellow Paper Example {spacer}");

    // keys are RLP-encoded strings, as in the yellow paper's account example
    let entries = [
        ("a711355", "45.0 ETH"),
        ("a77d4337", "1.00 WEI"),
        ("a779365", "1.1 ETH"),
        ("a77d397", "0.12 ETH"),
    ];
    let mut trie = Trie::new();
    for (key, value) in entries {
        trie.put(&alloy_rlp::encode(key), value.as_bytes().to_vec());
    }
    println!("Root hash: {}", trie.hash());

    let key = alloy_rlp::encode("a779365");
    let (proof, found) = trie.prove(&key);
    if !found {
        bail!("could not prove valid key");
    }
    let value = verify(trie.hash(), &key, &proof)?;

    println!("{}", render(&trie, 4));
    println!();
    println!("Key proof length: {}", proof.len());
    match value {
        Some(v) => println!("Key proof verified: {}", String::from_utf8_lossy(&v)),
        None => println!("Key proof verified: absent"),
    }
    Ok(())
}

fn run_prove(entries: &[Entry], key: &[u8], out: Option<PathBuf>) -> Result<()> {
    let trie = build(entries);
    let (proof, found) = trie.prove(key);

    println!("root: {}", trie.hash());
    println!("found: {}", found);

    let json = serde_json::to_string_pretty(&proof).context("failed to encode proof")?;
    match out {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("proof: {} ({} nodes)", path.display(), proof.len());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_verify(root: B256, key: &[u8], path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let proof: Proof = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse proof {}", path.display()))?;

    match verify(root, key, &proof).context("proof rejected")? {
        Some(value) => println!("value: 0x{}", hex::encode(value)),
        None => println!("absent"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Demo => run_demo()?,
        Commands::Root { values } => {
            println!("{}", mpt_trie::ordered_root(values.into_iter().map(|v| v.0)))
        }
        Commands::Prove { entries, key, out } => run_prove(&entries, &key.0, out)?,
        Commands::Verify { root, key, proof } => run_verify(root, &key.0, &proof)?,
        Commands::Walk { entries, leaves } => println!("{}", render(&build(&entries), leaves)),
    }

    Ok(())
}
