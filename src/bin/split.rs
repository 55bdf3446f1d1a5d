//! resptap Split CLI
//!
//! Splits a recorded byte stream into messages and prints them.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use resptap::capture::{split_file, split_reader, SplitSummary};
use resptap::{FrameLimits, Message, MessageKind, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// resptap Split
#[derive(Parser, Debug)]
#[command(name = "resptap-split")]
#[command(about = "Split a captured key-value protocol stream into messages")]
#[command(version)]
struct Args {
    /// Capture file (reads stdin when omitted)
    input: Option<PathBuf>,

    /// Bytes handed to the framer per read
    #[arg(short, long, default_value = "4096")]
    chunk_size: usize,

    /// Maximum bytes buffered while a message is incomplete
    #[arg(long, default_value = "536870912")]
    max_pending_bytes: usize,

    /// Maximum array nesting depth
    #[arg(long, default_value = "128")]
    max_depth: usize,

    /// Longest preview printed per message
    #[arg(long, default_value = "80")]
    preview: usize,

    /// Only print the summary
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).init();

    let args = Args::parse();

    match run(&args) {
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            eprintln!("resptap-split: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<SplitSummary> {
    let limits = FrameLimits {
        max_pending_bytes: args.max_pending_bytes,
        max_nesting_depth: args.max_depth,
    };
    limits.validate()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut index = 0usize;
    let print = |message: &Message| {
        index += 1;
        if !args.quiet {
            let _ = writeln!(
                out,
                "{:>6} {:<13} {:>8} {}",
                index,
                message.kind(),
                message.wire_len(),
                message.preview(args.preview)
            );
        }
    };

    match &args.input {
        Some(path) => split_file(path, args.chunk_size, limits, print),
        None => split_reader(io::stdin().lock(), args.chunk_size, limits, print),
    }
}

fn print_summary(summary: &SplitSummary) {
    println!(
        "{} messages from {} bytes ({} trailing)",
        summary.messages, summary.bytes_read, summary.trailing
    );
    for kind in MessageKind::ALL {
        println!("  {:<13} {}", kind, summary.count(kind));
    }
}
