//! Lists the credentials stored in a KDBX 3.1 database
//!
//! Reads the password from `--password` or, failing that, from the first
//! line of stdin. Secrets are never printed.

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use kdbx3_rs::{CompositeKey, CredentialRecord};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Provide a .kdbx database
    database: PathBuf,

    /// Print the unencrypted header and exit
    #[arg(long)]
    head_only: bool,

    /// Provide a keyfile
    #[arg(short = 'k', long)]
    key_file: Option<PathBuf>,

    /// Database password; read from stdin when omitted
    #[arg(short, long)]
    password: Option<String>,

    /// Only list entries whose notes, title, URL or username contain this text
    #[arg(short, long)]
    search: Option<String>,

    /// Log more detail to stderr (repeatable)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn print_header(kdbx: &kdbx3_rs::Kdbx<kdbx3_rs::binary::Locked>) {
    let header = kdbx.header();
    println!("Version: {}.{}", kdbx.major_version(), kdbx.minor_version());
    println!("Cipher: {:?}", header.cipher);
    println!("Inner stream: {:?}", header.inner_stream_cipher);
    println!("Compression: {:?}", header.compression_type);
    println!("Transform rounds: {}", header.transform_rounds);
    println!("Transform seed: {:?}", header.transform_seed);
    println!("Master Seed: {:?}", header.master_seed);
    println!("Encryption IV: {:?}", header.encryption_iv);
    println!("Other headers: {:?}", header.other_headers);
}

fn read_password(args: &Args) -> std::io::Result<Option<String>> {
    if let Some(password) = &args.password {
        return Ok(Some(password.clone()));
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(&['\r', '\n'][..]);
    Ok(if password.is_empty() {
        None
    } else {
        Some(password.to_string())
    })
}

fn list(records: &[CredentialRecord], search: Option<&str>) {
    let mut shown = 0;
    for (i, record) in records.iter().enumerate() {
        if search.map_or(true, |needle| record.matches(needle)) {
            println!("{}: {}", i + 1, record);
            shown += 1;
        }
    }
    log::info!("{} of {} entries shown", shown, records.len());
}

fn run(args: &Args) -> Result<(), kdbx3_rs::Error> {
    if args.head_only {
        print_header(&kdbx3_rs::open(&args.database)?);
        return Ok(());
    }

    let mut key = CompositeKey::new(read_password(args)?, None);
    if let Some(key_file) = &args.key_file {
        key = key.with_key_file(key_file)?;
    }

    let records = kdbx3_rs::read_credentials(&args.database, &key)?;
    list(&records, args.search.as_deref());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
