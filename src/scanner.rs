//! Scan orchestration: observer registration, seed-page extraction and the
//! single-hop subpage traversal.

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::extract;
use crate::matcher;
use crate::observers::ChannelObservers;
use crate::results::{DomMatch, ScanReport};
use crate::session::{BrowserSession, NavigationError};
use url::Url;

/// Where a scan currently is in its lifecycle.
///
/// `Failed` is terminal and reachable only from a seed-side failure; a
/// subpage navigation failure never leaves the normal path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    SessionOpen,
    SeedLoaded,
    SubpagesTraversed,
    Finalized,
    Failed,
}

/// Drives one full scan of a target.
pub struct Scanner {
    config: ScanConfig,
    phase: ScanPhase,
}

impl Scanner {
    /// Create a scanner for the given configuration
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            phase: ScanPhase::Idle,
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    /// Run the scan to completion.
    ///
    /// Opens one browser session, registers the console and network
    /// observers before the seed navigation, extracts all channels from the
    /// seed page, traverses the discovered subpages, and hands back the
    /// finalized report. The session is closed on both the success and the
    /// failure path; the observers are drained strictly after it is closed.
    pub async fn run(&mut self) -> Result<ScanReport, ScanError> {
        let seed_url = self.config.target.parsed_url()?;
        let keyword = self.config.target.keyword.clone();

        ::log::info!(
            "Starting scan of {} for keyword {:?}",
            seed_url,
            keyword
        );

        let session = BrowserSession::launch(&self.config).await?;
        self.phase = ScanPhase::SessionOpen;

        let observers = match ChannelObservers::attach(session.page(), &keyword).await {
            Ok(observers) => observers,
            Err(e) => {
                session.close().await;
                self.phase = ScanPhase::Failed;
                return Err(e);
            }
        };

        let outcome = self.scan_pages(&session, &seed_url, &keyword).await;

        // Close before finalizing the observers so no event can race the
        // drained accumulators
        session.close().await;
        let (console_matches, network_matches) = observers.finalize();

        match outcome {
            Ok(mut report) => {
                report.console_matches = console_matches;
                report.network_matches = network_matches;
                self.phase = ScanPhase::Finalized;
                ::log::info!(
                    "Scan finished with {} matches across all channels",
                    report.total_matches()
                );
                Ok(report)
            }
            Err(e) => {
                self.phase = ScanPhase::Failed;
                Err(e)
            }
        }
    }

    /// Load the seed page, run every extractor against it, then traverse
    /// the discovered subpages
    async fn scan_pages(
        &mut self,
        session: &BrowserSession,
        seed_url: &Url,
        keyword: &str,
    ) -> Result<ScanReport, ScanError> {
        ::log::info!("Navigating to seed page: {}", seed_url);
        if let Err(e) = session.navigate(seed_url.as_str()).await {
            return Err(seed_navigation_error(seed_url, e));
        }
        self.phase = ScanPhase::SeedLoaded;

        let mut report = ScanReport::new(self.config.target.clone());

        ::log::info!("Searching DOM for keyword: {}", keyword);
        for markup in extract::dom_matches(session, keyword).await? {
            report.dom_matches.push(DomMatch::ElementMarkup { markup });
        }

        ::log::info!("Extracting metadata...");
        report.metadata_matches = extract::metadata_matches(session, keyword).await?;

        let html = session.content().await?;
        report.script_refs = extract::extract_script_refs(&html);

        // A redirect can leave the document on a different URL than the
        // seed; link scope follows the page actually loaded
        let document_url = session
            .current_url()
            .await
            .unwrap_or_else(|| seed_url.clone());
        report.subpages = extract::discover_subpages(&document_url, &html);
        ::log::info!("Discovered {} same-origin subpages", report.subpages.len());

        self.traverse_subpages(session, keyword, &mut report).await;
        self.phase = ScanPhase::SubpagesTraversed;

        Ok(report)
    }

    /// Visit each discovered subpage exactly once and record its matching
    /// lines.
    ///
    /// The subpage set is closed before traversal starts: links found on
    /// subpages are never harvested, and a failed subpage contributes
    /// nothing but a log line.
    async fn traverse_subpages(
        &self,
        session: &BrowserSession,
        keyword: &str,
        report: &mut ScanReport,
    ) {
        let subpages: Vec<String> = report.subpages.iter().cloned().collect();

        for subpage in subpages {
            ::log::info!("Scanning subpage: {}", subpage);

            if let Err(e) = session.navigate(&subpage).await {
                ::log::warn!("Skipping subpage {}: {}", subpage, e);
                continue;
            }

            let content = match session.content().await {
                Ok(content) => content,
                Err(e) => {
                    ::log::warn!("Skipping subpage {}: {}", subpage, e);
                    continue;
                }
            };

            if matcher::contains(&content, keyword) {
                report.dom_matches.push(DomMatch::SubpageLines {
                    url: subpage,
                    lines: matcher::matching_lines(&content, keyword),
                });
            }
        }
    }
}

/// Maps a failed seed navigation to the fatal scan error
fn seed_navigation_error(url: &Url, error: NavigationError) -> ScanError {
    match error {
        NavigationError::Failed(e) => ScanError::SeedNavigation {
            url: url.to_string(),
            reason: e.to_string(),
        },
        NavigationError::TimedOut(timeout_secs) => ScanError::SeedNavigationTimeout {
            url: url.to_string(),
            timeout_secs,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Minimal site for traversal tests: the seed links to a live subpage
    /// and to one whose connection is dropped before any response is sent.
    async fn serve_site() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };

                tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    let n = stream.read(&mut buf).await.unwrap_or(0);
                    let request = String::from_utf8_lossy(&buf[..n]).to_string();
                    let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();

                    let body = match path.as_str() {
                        "/" => {
                            "<html><body><a href=\"/about\">about</a>\
                             <a href=\"/dead\">dead</a></body></html>"
                        }
                        "/about" => "<html><body><p>about foo here</p></body></html>",
                        // Close without responding so navigation fails
                        "/dead" => return,
                        _ => "<html></html>",
                    };

                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                });
            }
        });

        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_invalid_seed_url_fails_before_session_opens() {
        // "https://" parses to nothing; the scan must abort before any
        // browser work happens
        let mut scanner = Scanner::new(ScanConfig::new("https://", "foo"));
        let result = scanner.run().await;

        assert!(matches!(result, Err(ScanError::InvalidSeedUrl { .. })));
        assert_eq!(scanner.phase(), ScanPhase::Idle);
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_subpage_failure_does_not_abort_traversal() {
        let base = serve_site().await;

        let mut scanner = Scanner::new(ScanConfig::new(&base, "foo"));
        let report = scanner.run().await.expect("scan failed");

        // The dead subpage is skipped, not fatal
        assert_eq!(scanner.phase(), ScanPhase::Finalized);
        assert_eq!(report.subpages.len(), 2);

        // The live subpage still contributes its matching lines
        let subpage_urls: Vec<String> = report
            .dom_matches
            .iter()
            .filter_map(|m| match m {
                DomMatch::SubpageLines { url, .. } => Some(url.clone()),
                DomMatch::ElementMarkup { .. } => None,
            })
            .collect();
        assert_eq!(subpage_urls, vec![format!("{}/about", base)]);

        let lines_match = report.dom_matches.iter().any(|m| matches!(
            m,
            DomMatch::SubpageLines { lines, .. }
                if lines.iter().any(|line| line.contains("about foo here"))
        ));
        assert!(lines_match);
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_scan_data_url_end_to_end() {
        let html = "<html><head><meta name=\"description\" content=\"contains foo here\">\
                    </head><body><p>foo appears</p><p>nothing</p></body></html>";
        let url = format!("data:text/html,{}", html);

        let mut scanner = Scanner::new(ScanConfig::new(&url, "foo"));
        let report = scanner.run().await.expect("scan failed");

        assert_eq!(scanner.phase(), ScanPhase::Finalized);

        // The matching <p> and all its ancestors carry the keyword in their
        // text content
        assert!(report.dom_matches.iter().any(|m| matches!(
            m,
            DomMatch::ElementMarkup { markup } if markup == "<p>foo appears</p>"
        )));

        assert_eq!(report.metadata_matches.len(), 1);
        assert_eq!(
            report.metadata_matches[0].name.as_deref(),
            Some("description")
        );

        // data: URLs have an opaque origin, so no subpages are discovered
        assert!(report.subpages.is_empty());
    }
}
