use crate::config::ScanTarget;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A network response whose decoded body contained the keyword
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkMatch {
    /// URL of the response
    pub url: String,

    /// HTTP status code of the response
    pub status: i64,

    /// Every line of the body containing the keyword, in body order
    pub matching_lines: Vec<String>,
}

/// A keyword match found at the DOM level.
///
/// Seed-page matches carry raw element markup; subpage matches carry line
/// excerpts of the rendered content. The two shapes are distinct on purpose
/// so the result writer can branch exhaustively on the variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomMatch {
    /// Outer markup of a seed-page element whose text content matched
    ElementMarkup { markup: String },

    /// Matching lines of a subpage's rendered content
    SubpageLines { url: String, lines: Vec<String> },
}

/// A `<meta>` tag whose content contained the keyword
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaMatch {
    /// The tag's `name` attribute, passed through unmodified (may be absent)
    pub name: Option<String>,

    /// The tag's `content` attribute
    pub content: String,
}

/// Everything a scan accumulated across its observation channels.
///
/// Created empty at scan start, each collection mutated by exactly one
/// observer or extractor, read-only once traversal completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// The target this report was produced for
    pub target: ScanTarget,

    /// Console messages containing the keyword, in emission order
    pub console_matches: Vec<String>,

    /// Network responses whose bodies contained the keyword
    pub network_matches: Vec<NetworkMatch>,

    /// DOM-level matches from the seed page and subpages
    pub dom_matches: Vec<DomMatch>,

    /// `src` URLs of the seed page's script elements
    pub script_refs: Vec<String>,

    /// Meta tags whose content contained the keyword
    pub metadata_matches: Vec<MetaMatch>,

    /// Same-origin URLs discovered on the seed page
    pub subpages: HashSet<String>,
}

impl ScanReport {
    /// Create an empty report for the given target
    pub fn new(target: ScanTarget) -> Self {
        Self {
            target,
            console_matches: Vec::new(),
            network_matches: Vec::new(),
            dom_matches: Vec::new(),
            script_refs: Vec::new(),
            metadata_matches: Vec::new(),
            subpages: HashSet::new(),
        }
    }

    /// Total number of keyword matches across all channels
    pub fn total_matches(&self) -> usize {
        self.console_matches.len()
            + self.network_matches.len()
            + self.dom_matches.len()
            + self.metadata_matches.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_match_variants_are_tagged() {
        let markup = DomMatch::ElementMarkup {
            markup: "<p>foo</p>".to_string(),
        };
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["kind"], "element_markup");

        let subpage = DomMatch::SubpageLines {
            url: "https://example.com/about".to_string(),
            lines: vec!["foo".to_string()],
        };
        let json = serde_json::to_value(&subpage).unwrap();
        assert_eq!(json["kind"], "subpage_lines");
        assert_eq!(json["url"], "https://example.com/about");
    }

    #[test]
    fn test_meta_match_tolerates_null_name() {
        // Shape returned by the in-page metadata query for a nameless tag
        let found: MetaMatch =
            serde_json::from_value(serde_json::json!({"name": null, "content": "contains foo"}))
                .unwrap();
        assert!(found.name.is_none());
        assert_eq!(found.content, "contains foo");
    }

    #[test]
    fn test_new_report_is_empty() {
        let report = ScanReport::new(ScanTarget::new("example.com", "foo"));
        assert!(report.console_matches.is_empty());
        assert!(report.network_matches.is_empty());
        assert!(report.dom_matches.is_empty());
        assert!(report.script_refs.is_empty());
        assert!(report.metadata_matches.is_empty());
        assert!(report.subpages.is_empty());
        assert_eq!(report.total_matches(), 0);
    }
}
