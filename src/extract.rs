//! One-shot page extractors: DOM matches, links, script references and
//! metadata.
//!
//! DOM and metadata extraction run inside the page, with the keyword passed
//! as a call argument so it is never spliced into executable script text.
//! Link and script extraction parse the rendered markup on our side.

use crate::error::ScanError;
use crate::results::MetaMatch;
use crate::session::BrowserSession;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// In-page query collecting the outer markup of every element whose
/// rendered text content contains the keyword
const DOM_MATCH_FN: &str = r#"
    (keyword) => {
        const matches = [];
        for (const el of document.querySelectorAll("*")) {
            if (el.textContent.includes(keyword)) {
                matches.push(el.outerHTML);
            }
        }
        return matches;
    }
"#;

/// In-page query collecting meta tags whose content contains the keyword
const META_MATCH_FN: &str = r#"
    (keyword) => Array.from(document.querySelectorAll("meta"))
        .map(meta => ({
            name: meta.getAttribute("name"),
            content: meta.getAttribute("content"),
        }))
        .filter(meta => meta.content && meta.content.includes(keyword))
"#;

/// Collect the outer markup of every seed-page element whose text content
/// contains the keyword.
///
/// Matches are not deduplicated against ancestors: a parent and a matching
/// child can both appear, since the parent's text content includes the
/// child's.
pub async fn dom_matches(
    session: &BrowserSession,
    keyword: &str,
) -> Result<Vec<String>, ScanError> {
    let value = session
        .evaluate_with_arg(DOM_MATCH_FN, serde_json::json!(keyword))
        .await?;

    serde_json::from_value(value)
        .map_err(|e| ScanError::Evaluate(format!("unexpected DOM match shape: {}", e)))
}

/// Collect `{name, content}` pairs of every meta tag whose content contains
/// the keyword. The `name` attribute may be absent and is passed through
/// unmodified.
pub async fn metadata_matches(
    session: &BrowserSession,
    keyword: &str,
) -> Result<Vec<MetaMatch>, ScanError> {
    let value = session
        .evaluate_with_arg(META_MATCH_FN, serde_json::json!(keyword))
        .await?;

    serde_json::from_value(value)
        .map_err(|e| ScanError::Evaluate(format!("unexpected metadata shape: {}", e)))
}

/// Extract every anchor's raw `href` attribute from rendered markup
pub fn extract_hrefs(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("a").unwrap();

    doc.select(&selector)
        .filter_map(|e| e.value().attr("href"))
        .map(|s| s.to_string())
        .collect()
}

/// Extract the `src` attribute of every script element from rendered
/// markup, excluding inline scripts (no `src`) and empty `src` values
pub fn extract_script_refs(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse("script").unwrap();

    doc.select(&selector)
        .filter_map(|e| e.value().attr("src"))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Resolve hrefs against the document URL and keep those sharing its origin
/// (scheme + host + port).
///
/// Duplicate resolved URLs collapse to one entry; no canonicalization of
/// trailing slashes, query strings or fragments beyond the resolution
/// itself.
pub fn same_origin_links(document_url: &Url, hrefs: &[String]) -> HashSet<String> {
    let origin = document_url.origin();

    hrefs
        .iter()
        .filter_map(|href| document_url.join(href).ok())
        .filter(|resolved| resolved.origin() == origin)
        .map(|resolved| resolved.to_string())
        .collect()
}

/// Harvest the subpage set from rendered markup: every anchor href resolved
/// against the loaded document's URL and filtered to the document's origin.
///
/// The document URL is the page actually loaded, which after a redirect can
/// differ from the URL that was navigated to.
pub fn discover_subpages(document_url: &Url, html: &str) -> HashSet<String> {
    same_origin_links(document_url, &extract_hrefs(html))
}
