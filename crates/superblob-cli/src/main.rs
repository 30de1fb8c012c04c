//! Command-line interface for inspecting and building SuperBlob containers.
//!
//! Numeric arguments (magics, slot types, sizes) accept decimal or
//! `0x`-prefixed hexadecimal.

use clap::{ArgAction, Parser, Subcommand};
use log::{info, LevelFilter};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use superblob::{BlobBuf, Maker, SuperBlobBuf};

#[derive(Parser)]
#[command(name = "superblob")]
#[command(about = "Inspect and build SuperBlob containers")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a container and list its slots
    Inspect {
        /// Container file
        input: PathBuf,

        /// Expected container magic
        #[arg(short, long, value_parser = parse_u32)]
        magic: u32,

        /// Reject containers declaring more bytes than this
        #[arg(long, value_parser = parse_u32)]
        max_size: Option<u32>,

        /// Print the SHA-256 of each sub-blob
        #[arg(long)]
        sha256: bool,
    },

    /// Write one sub-blob to a file
    Extract {
        /// Container file
        input: PathBuf,

        /// Expected container magic
        #[arg(short, long, value_parser = parse_u32)]
        magic: u32,

        /// Slot type to extract
        #[arg(short = 't', long = "type", value_parser = parse_u32)]
        slot_type: u32,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build a container from sub-blob files
    Pack {
        /// Container magic
        #[arg(short, long, value_parser = parse_u32)]
        magic: u32,

        /// Slot entry as TYPE=FILE; repeat for each slot
        #[arg(short, long = "entry", value_parser = parse_entry, required = true)]
        entries: Vec<(u32, PathBuf)>,

        /// Treat entry files as raw payloads and wrap them with this magic
        #[arg(long, value_parser = parse_u32)]
        wrap: Option<u32>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Combine containers; slots from later files replace earlier ones
    Merge {
        /// Container files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Container magic, shared by inputs and output
        #[arg(short, long, value_parser = parse_u32)]
        magic: u32,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match cli.command {
        Command::Inspect {
            input,
            magic,
            max_size,
            sha256,
        } => inspect(&input, magic, max_size, sha256),
        Command::Extract {
            input,
            magic,
            slot_type,
            output,
        } => extract(&input, magic, slot_type, &output),
        Command::Pack {
            magic,
            entries,
            wrap,
            output,
        } => pack(magic, &entries, wrap, &output),
        Command::Merge {
            inputs,
            magic,
            output,
        } => merge(&inputs, magic, &output),
    }
}

fn load(
    path: &Path,
    magic: u32,
    max_size: Option<u32>,
) -> Result<SuperBlobBuf, Box<dyn std::error::Error>> {
    let data = fs::read(path)?;
    let superblob = SuperBlobBuf::from_vec(data, magic, max_size)
        .map_err(|e| format!("{}: {}", path.display(), e))?;
    info!("loaded {} ({} bytes)", path.display(), superblob.length());
    Ok(superblob)
}

fn inspect(
    input: &Path,
    magic: u32,
    max_size: Option<u32>,
    sha256: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let superblob = load(input, magic, max_size)?;
    let view = superblob.view();

    println!("magic:  {:#010x}", view.magic());
    println!("length: {}", view.length());
    println!("count:  {}", view.count());
    for slot in view.slots() {
        match slot.blob() {
            None => println!(
                "slot {:>3}  type {:#010x}  (empty)",
                slot.index(),
                slot.slot_type()
            ),
            Some(blob) => {
                let mut line = format!(
                    "slot {:>3}  type {:#010x}  offset {:>8}  length {:>8}  magic {:#010x}",
                    slot.index(),
                    slot.slot_type(),
                    slot.offset(),
                    blob.length(),
                    blob.magic()
                );
                if sha256 {
                    line.push_str("  sha256 ");
                    line.push_str(&hex::encode(Sha256::digest(blob.as_bytes())));
                }
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn extract(
    input: &Path,
    magic: u32,
    slot_type: u32,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let superblob = load(input, magic, None)?;
    let view = superblob.view();

    let slot = view
        .find(slot_type)
        .ok_or_else(|| format!("no slot of type {:#x}", slot_type))?;
    let blob = slot
        .blob()
        .ok_or_else(|| format!("slot of type {:#x} is empty", slot_type))?;

    fs::write(output, blob.as_bytes())?;
    println!("Extracted: {} ({} bytes)", output.display(), blob.length());
    Ok(())
}

fn pack(
    magic: u32,
    entries: &[(u32, PathBuf)],
    wrap: Option<u32>,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut maker = Maker::new(magic);

    for (slot_type, path) in entries {
        let data = fs::read(path)?;
        let blob = match wrap {
            Some(piece_magic) => BlobBuf::new(piece_magic, &data)?,
            None => BlobBuf::from_vec(data).map_err(|e| format!("{}: {}", path.display(), e))?,
        };
        if maker.add(*slot_type, blob).is_some() {
            info!(
                "slot {:#x} given more than once, keeping {}",
                slot_type,
                path.display()
            );
        }
    }

    write_made(&maker, output)
}

fn merge(inputs: &[PathBuf], magic: u32, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut maker = Maker::new(magic);

    for path in inputs {
        let superblob = load(path, magic, None)?;
        maker.add_superblob(&superblob.view());
    }

    write_made(&maker, output)
}

fn write_made(maker: &Maker, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let superblob = maker.make()?;
    fs::write(output, superblob.as_bytes())?;
    println!(
        "Wrote: {} ({} slots, {} bytes)",
        output.display(),
        superblob.view().count(),
        superblob.length()
    );
    Ok(())
}

fn parse_u32(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

fn parse_entry(s: &str) -> Result<(u32, PathBuf), String> {
    let (slot_type, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=FILE, got '{}'", s))?;
    Ok((parse_u32(slot_type)?, PathBuf::from(path)))
}
