use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Operator tool for StableVault memory images and snapshot blobs
#[derive(Parser, Debug)]
#[command(name = "stablevault", version, about = "StableVault operator CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Format a new memory image (header page + empty region table)
    Init {
        #[arg(long)]
        path: PathBuf,
        /// Virtual pages reserved per region id (default: SV_SPAN_PAGES or 8192)
        #[arg(long)]
        span_pages: Option<u64>,
    },
    /// Print header, regions and frame lengths
    ///
    /// Example:
    ///   stablevault status --path ./unit.img --json
    Status {
        #[arg(long)]
        path: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Raw read inside a region (offset 0 is the frame length prefix)
    Read {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        region: u8,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long)]
        len: u64,
        /// Write the raw bytes here instead of printing a hex dump
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Raw write inside a region. Value: literal, hex:..., @file or - (stdin)
    Write {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        region: u8,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long)]
        value: String,
    },
    /// Grow a region by N pages (registers it if needed)
    Grow {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        region: u8,
        #[arg(long)]
        pages: u64,
    },
    /// Download the stored snapshot of a region in chunks into a file
    Export {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        region: u8,
        #[arg(long)]
        out: PathBuf,
        /// Chunk size (default: SV_CHUNK_BYTES or 1572864)
        #[arg(long)]
        chunk_bytes: Option<usize>,
    },
    /// Validate a snapshot blob, then clear the region and upload it in chunks
    Import {
        #[arg(long)]
        path: PathBuf,
        #[arg(long)]
        region: u8,
        #[arg(long)]
        from: PathBuf,
        #[arg(long)]
        chunk_bytes: Option<usize>,
    },
    /// Decode a snapshot blob and print its value tree
    Inspect {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Replace one field of a snapshot blob
    ///
    /// PATH is a dot-separated index path ("1", "3.0.2").
    /// VALUE is typed: u64:5, i64:-1, str:text, bool:true, f64:1.5, hex:00ff.
    Patch {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        field: String,
        #[arg(long)]
        value: String,
        #[arg(long)]
        out: PathBuf,
    },
}
