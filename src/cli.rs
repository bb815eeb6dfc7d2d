use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::helper::is_http_url;

#[derive(Parser, Debug)]
#[command(name = "apklib")]
#[command(version)]
#[command(about = "Inspect and install the native libraries of an APK", long_about = None)]
#[command(after_help = "Examples:\n  \
  apklib app.apk abi arm64-v8a armeabi-v7a     pick the ABI to install\n  \
  apklib app.apk copy arm64-v8a /data/app/lib   install that ABI's libraries\n  \
  apklib https://example.com/app.apk list       list libraries of a remote APK")]
pub struct Cli {
    /// APK path or HTTP URL
    #[arg(value_name = "APK")]
    pub file: String,

    #[command(subcommand)]
    pub command: Command,

    /// More logging (-vv => trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only print results, no warnings
    #[arg(short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// HTTP request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub http_timeout: u64,

    /// Retries per HTTP range request
    #[arg(long, value_name = "N", default_value_t = 10)]
    pub http_retries: u32,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List native libraries, optionally only those of one ABI
    List {
        #[arg(value_name = "ABI")]
        abi: Option<String>,
    },
    /// Pick the most preferred ABI the APK has libraries for
    Abi {
        /// Supported ABIs, most preferred first
        #[arg(value_name = "ABI", required = true)]
        abis: Vec<String>,
    },
    /// Total uncompressed size of one ABI's libraries
    Size {
        #[arg(value_name = "ABI")]
        abi: String,
    },
    /// Install one ABI's libraries into a directory
    Copy {
        #[arg(value_name = "ABI")]
        abi: String,
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },
    /// Check for RenderScript bitcode
    Bitcode,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        is_http_url(&self.file)
    }

    /// Default log filter for the chosen verbosity.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            return tracing::Level::ERROR;
        }
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_copy_command() {
        let cli = Cli::parse_from(["apklib", "-vv", "app.apk", "copy", "x86", "/tmp/lib"]);
        assert_eq!(cli.log_level(), tracing::Level::DEBUG);
        assert!(!cli.is_http_url());
        match cli.command {
            Command::Copy { abi, dir } => {
                assert_eq!(abi, "x86");
                assert_eq!(dir, PathBuf::from("/tmp/lib"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn abi_needs_at_least_one_label() {
        assert!(Cli::try_parse_from(["apklib", "app.apk", "abi"]).is_err());
        let cli = Cli::try_parse_from(["apklib", "app.apk", "abi", "x86_64", "x86"]).unwrap();
        assert!(matches!(cli.command, Command::Abi { ref abis } if abis.len() == 2));
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["apklib", "-q", "-v", "app.apk", "bitcode"]).is_err());
        let cli = Cli::parse_from(["apklib", "-q", "https://host/app.apk", "bitcode"]);
        assert!(cli.is_http_url());
        assert_eq!(cli.log_level(), tracing::Level::ERROR);
    }
}
