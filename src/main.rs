//! gzinflate - gunzip and zcat on top of a from-scratch DEFLATE decoder
//!
//! Every input is decoded in one pass from a memory-mapped buffer; separate
//! files are spread across a thread pool.

use std::io;
use std::process;

use tracing::level_filters::LevelFilter;

use gzinflate::cli::GzArgs;
use gzinflate::decompression;
use gzinflate::error::GzError;

const VERSION: &str = concat!("gzinflate ", env!("CARGO_PKG_VERSION"));

fn main() {
    let result = run();

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("gzinflate: {}", e);
            process::exit(1);
        }
    }
}

fn run() -> Result<i32, GzError> {
    let args = GzArgs::parse()?;

    if args.version {
        println!("{}", VERSION);
        return Ok(0);
    }

    if args.help {
        print_help();
        return Ok(0);
    }

    init_logging(&args);
    decompression::process_inputs(&args)
}

fn log_level(args: &GzArgs) -> LevelFilter {
    if args.quiet {
        return LevelFilter::OFF;
    }
    match args.verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn init_logging(args: &GzArgs) {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(log_level(args))
        .with_target(false)
        .without_time()
        .init();
}

fn print_help() {
    println!("Usage: gzinflate [OPTION]... [FILE]...");
    println!();
    println!("Decompress gzip FILEs (by default, in place).");
    println!("With no FILE, or when FILE is -, read standard input.");
    println!();
    println!("Options:");
    println!("  -c, --stdout      Write to stdout, keep original files");
    println!("  -d, --decompress  Decompress (always on)");
    println!("  -f, --force       Overwrite existing output files");
    println!("  -k, --keep        Keep original files");
    println!("  -l, --list        List compressed and uncompressed sizes");
    println!("  -t, --test        Test compressed file integrity");
    println!("  -N, --name        Restore the file name stored in the header");
    println!("  -n, --no-name     Do not restore the stored name (default)");
    println!("  -r, --recursive   Recurse into directories");
    println!("  -S, --suffix SUF  Use suffix SUF (default: .gz)");
    println!("  -p, --processes N Number of files decoded at once (default: all CPUs)");
    println!("  -q, --quiet       Suppress all messages");
    println!("  -v, --verbose     Verbose output, repeat for decoder tracing");
    println!("  -h, --help        Show this help");
    println!("  -V, --version     Show version");
    println!();
    println!("Examples:");
    println!("  gzinflate file.txt.gz        Decompress file.txt.gz to file.txt");
    println!("  gzinflate -c a.gz b.gz > ab  Concatenate decoded files");
    println!("  gzinflate -lv *.gz           Show sizes, CRCs and ratios");
    println!("  zcat < file.gz               Decode stdin to stdout");
}
