//! Command-line front end for apklib.
//!
//! Opens a local or remote APK and runs one native library query against
//! it. Results go to stdout, logs to stderr.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use apklib::cli::Command;
use apklib::native::NativeLibraries;
use apklib::{
    AcceleratorBridge, ApkHandle, BitcodeScan, Cli, HttpRangeReader, InstallStatus, LocalFileReader,
    ReadAt, abi_code,
};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(cli.log_level())
        .with_target(false)
        .init();

    if cli.is_http_url() {
        let reader = Arc::new(HttpRangeReader::with_options(
            cli.file.clone(),
            Duration::from_secs(cli.http_timeout),
            cli.http_retries,
        )?);
        let transferred_before = reader.transferred_bytes();

        let code = run(&cli, reader.clone())?;

        if !cli.quiet {
            let transferred = reader.transferred_bytes() - transferred_before;
            eprintln!("Total bytes transferred: {}", format_size(transferred));
        }
        Ok(code)
    } else {
        let reader = Arc::new(LocalFileReader::new(std::path::Path::new(&cli.file))?);
        run(&cli, reader)
    }
}

fn run(cli: &Cli, reader: Arc<dyn ReadAt>) -> Result<ExitCode> {
    let apk = ApkHandle::from_reader(cli.file.as_str(), reader, AcceleratorBridge::global())?;

    let ok = match &cli.command {
        Command::List { abi } => {
            for library in NativeLibraries::new(apk.archive())? {
                if abi.as_deref().is_some_and(|abi| abi != library.abi()) {
                    continue;
                }
                println!(
                    "{:>10}  {}",
                    library.entry.uncompressed_size,
                    library.name.as_str()
                );
            }
            true
        }
        Command::Abi { abis } => {
            let result = apk.find_supported_abi(abis.as_slice());
            match &result {
                Ok(found) => match found.index() {
                    Some(index) => println!("{} {}", abis[index], found.code()),
                    None => println!("{}", found),
                },
                Err(e) => println!("{}: {}", e.status(), e),
            }
            abi_code(&result) >= 0
        }
        Command::Size { abi } => {
            let total = apk.sum_native_binaries(abi);
            println!("{} ({})", total, format_size(total));
            true
        }
        Command::Copy { abi, dir } => {
            let result = apk.copy_native_binaries(dir, abi);
            let status = InstallStatus::of(&result);
            match &result {
                Ok(()) => println!("{}", status),
                Err(e) => println!("{}: {}", status, e),
            }
            result.is_ok()
        }
        Command::Bitcode => {
            let scan = apk.has_renderscript_bitcode();
            println!("{:?} ({})", scan, scan.code());
            scan != BitcodeScan::ScanError
        }
    };

    apk.close();
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Format a byte size into a human-readable string.
///
/// Automatically selects the appropriate unit (bytes, KB, MB, GB)
/// based on the size magnitude.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
