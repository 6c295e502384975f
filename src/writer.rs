//! Persists a finalized scan report, one file per observation channel.

use crate::results::{DomMatch, MetaMatch, NetworkMatch, ScanReport};
use std::fs;
use std::path::Path;

/// Write each of the report's collections to its own file under `dir`.
///
/// The directory is created if needed. Existing files are overwritten.
pub fn write_report(report: &ScanReport, dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;

    fs::write(
        dir.join("console_logs.txt"),
        report.console_matches.join("\n"),
    )?;

    let network = report
        .network_matches
        .iter()
        .map(render_network_match)
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(dir.join("network_matches.txt"), network)?;

    let dom = report
        .dom_matches
        .iter()
        .map(render_dom_match)
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(dir.join("dom_matches.html"), dom)?;

    fs::write(
        dir.join("javascript_files.txt"),
        report.script_refs.join("\n"),
    )?;

    let metadata = report
        .metadata_matches
        .iter()
        .map(render_meta_match)
        .collect::<Vec<_>>()
        .join("\n");
    fs::write(dir.join("metadata_matches.txt"), metadata)?;

    // Sorted for stable output; the set itself has no defined order
    let mut subpages: Vec<&str> = report.subpages.iter().map(String::as_str).collect();
    subpages.sort_unstable();
    fs::write(dir.join("subpages.txt"), subpages.join("\n"))?;

    ::log::info!("Results written to {}", dir.display());
    Ok(())
}

fn render_network_match(found: &NetworkMatch) -> String {
    format!(
        "URL: {}\nStatus: {}\nMatches:\n{}\n",
        found.url,
        found.status,
        found.matching_lines.join("\n")
    )
}

fn render_dom_match(found: &DomMatch) -> String {
    match found {
        DomMatch::ElementMarkup { markup } => markup.clone(),
        DomMatch::SubpageLines { url, lines } => {
            format!("Subpage URL: {}\nMatches:\n{}", url, lines.join("\n"))
        }
    }
}

fn render_meta_match(found: &MetaMatch) -> String {
    format!(
        "Name: {}, Content: {}",
        found.name.as_deref().unwrap_or(""),
        found.content
    )
}
