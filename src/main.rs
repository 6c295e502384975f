use clap::Parser;
use webscan::results::ScanReport;
use webscan::{ScanConfig, Scanner, writer};

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = ScanConfig::new(&args.url, &args.keyword);
    config.navigation_timeout_secs = args.timeout;
    config.chrome_binary = args.chrome;

    let mut scanner = Scanner::new(config);
    let report = match scanner.run().await {
        Ok(report) => report,
        Err(e) => {
            // A fatal error means no partial results are written
            ::log::error!("Scan failed: {}", e);
            std::process::exit(1);
        }
    };

    print_summary(&report);

    if let Err(e) = writer::write_report(&report, &args.output) {
        ::log::error!("Failed to write results: {}", e);
        std::process::exit(1);
    }

    println!("Results saved to {}", args.output.display());
}

/// Prints per-channel match counts for the finished scan
fn print_summary(report: &ScanReport) {
    println!("Scan of {} complete:", report.target.url);
    println!("  console matches:  {}", report.console_matches.len());
    println!("  network matches:  {}", report.network_matches.len());
    println!("  DOM matches:      {}", report.dom_matches.len());
    println!("  script files:     {}", report.script_refs.len());
    println!("  metadata matches: {}", report.metadata_matches.len());
    println!("  subpages visited: {}", report.subpages.len());
}
