use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use flate2::read::GzDecoder;
use grbfile::{
    inspect, read_path, BinFileView, BinaryMetadata, Compression, MemoryEngine, ReadOptions,
    SparseEngine,
};
use grbfile_core::format::constants::HEADER_LEN;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "grbfile")]
#[command(version)]
#[command(about = "Inspect and verify GraphBLAS binary matrix files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the header and metadata of a file
    Info(InfoArgs),

    /// Load a file into the reference engine and report what it holds
    Check(CheckArgs),
}

#[derive(Args)]
struct InfoArgs {
    file: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// The file is gzip-compressed
    #[arg(long)]
    gzip: bool,
}

#[derive(Args)]
struct CheckArgs {
    file: PathBuf,

    /// The file is gzip-compressed
    #[arg(long)]
    gzip: bool,

    /// Accept files written by any library version
    #[arg(long)]
    any_version: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(tracing_subscriber::EnvFilter::new(&cli.log_level))
        .init();

    let outcome = match cli.command {
        Commands::Info(args) => info(&args),
        Commands::Check(args) => check(&args),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn open_view(path: &Path, gzip: bool) -> grbfile::Result<BinFileView> {
    if !gzip {
        return BinFileView::open(path);
    }
    let mut bytes = Vec::new();
    GzDecoder::new(BufReader::new(File::open(path)?)).read_to_end(&mut bytes)?;
    BinFileView::from_bytes(path, bytes)
}

fn info(args: &InfoArgs) -> grbfile::Result<()> {
    let view = open_view(&args.file, args.gzip)?;
    let summary = view.summary();

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|err| grbfile::Error::Unsupported(err.to_string()))?;
        println!("{json}");
        return Ok(());
    }

    println!("{}", view.header_text().trim_end());
    println!("---");
    println!("implementation:   {}", summary.implementation);
    println!("sparsity control: {}", summary.sparsity_control);
    println!("hyper switch:     {}", summary.hyper_switch);
    println!("bitmap switch:    {}", summary.bitmap_switch);
    for region in &summary.regions {
        println!(
            "{:<3} offset {:>10}  len {:>10}",
            region.name, region.offset, region.len
        );
    }
    if summary.trailing_bytes > 0 {
        println!("trailing bytes:   {}", summary.trailing_bytes);
    }
    Ok(())
}

fn check(args: &CheckArgs) -> grbfile::Result<()> {
    let compression = if args.gzip {
        Compression::gzip()
    } else {
        Compression::None
    };

    let mut engine = MemoryEngine::new();
    if args.any_version {
        let (major, minor, sub) = file_version(&args.file, args.gzip)?;
        engine = engine.with_version(major, minor, sub);
    }

    let options = ReadOptions::default().with_compression(compression);
    let matrix = read_path(&engine, &args.file, &options)?;
    let layout = inspect(&engine, &matrix)?;
    println!(
        "ok: {} x {} {} {}, {} entries",
        layout.nrows,
        layout.ncols,
        layout.element_type,
        layout.layout(),
        layout.nvals
    );
    engine.matrix_free(matrix)?;
    Ok(())
}

/// Library version encoded in the file's implementation id
fn file_version(path: &Path, gzip: bool) -> grbfile::Result<(u32, u32, u32)> {
    let file = BufReader::new(File::open(path)?);
    let mut source: Box<dyn Read> = if gzip {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    let mut prefix = [0u8; HEADER_LEN + 8];
    source
        .read_exact(&mut prefix)
        .map_err(|_| grbfile::FormatError::Truncated)?;
    let id = BinaryMetadata::implementation_of(&prefix[HEADER_LEN..])?;
    Ok((
        (id / 1_000_000) as u32,
        (id / 1_000 % 1_000) as u32,
        (id % 1_000) as u32,
    ))
}
