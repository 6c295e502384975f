use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "webscan")]
#[command(about = "Scans a page and its same-origin subpages for a keyword across browser channels")]
#[command(version)]
pub struct Args {
    /// Website URL to scan (https:// is assumed when no scheme is given)
    pub url: String,

    /// Keyword to search for (case-sensitive)
    pub keyword: String,

    /// Directory to write per-channel result files into
    #[arg(short, long, default_value = "scan_results")]
    pub output: PathBuf,

    /// Path to a Chromium/Chrome binary (auto-detected when omitted)
    #[arg(long)]
    pub chrome: Option<PathBuf>,

    /// Navigation timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,
}
