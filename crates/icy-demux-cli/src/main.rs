//! icy-demux CLI — split a captured ICY stream into audio and metadata

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use icy_demux::config::cli::DEFAULT_CHUNK_SIZE;
use icy_demux::stream::{DemuxStats, IcyDemuxer, IcyMetadata};

#[derive(Parser)]
#[command(
    name = "icy-demux",
    about = "Split a captured ICY stream into audio and metadata",
    version
)]
struct Cli {
    /// Captured stream, or `-` for stdin
    input: String,

    /// Audio bytes between metadata markers (the icy-metaint header)
    #[arg(short, long)]
    metaint: usize,

    /// Write the audio payload to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Bytes fed to the demuxer per read
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Log debug diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(stats) => print_summary(&stats),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: &Cli) -> icy_demux::Result<DemuxStats> {
    let mut input: Box<dyn Read> = if cli.input == "-" {
        Box::new(io::stdin().lock())
    } else {
        Box::new(File::open(&cli.input)?)
    };

    let mut output = match &cli.output {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    let mut demuxer = IcyDemuxer::new(cli.metaint)?;
    let mut buf = vec![0u8; cli.chunk_size.max(1)];
    let stdout = io::stdout();
    let mut stdout = stdout.lock();

    info!(metaint = cli.metaint, chunk_size = buf.len(), "demuxing {}", cli.input);

    loop {
        let n = match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        let mut blocks = Vec::new();
        let mut on_metadata = |metadata: IcyMetadata| blocks.push(metadata);
        let audio = demuxer.handle(&buf[..n], Some(&mut on_metadata));

        for metadata in &blocks {
            print_metadata(&mut stdout, metadata)?;
        }
        if let Some(out) = output.as_mut() {
            out.write_all(&audio)?;
        }
    }

    if let Some(mut out) = output {
        out.flush()?;
    }

    if demuxer.is_collecting_metadata() {
        warn!("stream ended inside a metadata block");
    }

    Ok(demuxer.stats())
}

fn print_metadata(out: &mut impl Write, metadata: &IcyMetadata) -> io::Result<()> {
    if metadata.is_empty() {
        return writeln!(out, "(metadata block without known keys)");
    }
    if let Some(title) = metadata.stream_title() {
        writeln!(out, "StreamTitle: {}", title)?;
    }
    if let Some(url) = metadata.stream_url() {
        writeln!(out, "StreamUrl: {}", url)?;
    }
    Ok(())
}

fn print_summary(stats: &DemuxStats) {
    eprintln!(
        "{} bytes in: {} audio, {} metadata ({} blocks, {} empty markers)",
        stats.total_bytes_in,
        stats.total_audio_bytes,
        stats.total_metadata_bytes,
        stats.blocks_completed,
        stats.empty_markers,
    );

    let problems = stats.malformed_entries + stats.lossy_blocks + stats.bounds_violations;
    if problems > 0 {
        eprintln!(
            "diagnostics: {} malformed entries, {} lossily decoded blocks, {} bounds violations",
            stats.malformed_entries, stats.lossy_blocks, stats.bounds_violations,
        );
    }
}
