//! Reactive channel observers: console messages and network responses.
//!
//! Both observers are registered on the page before the seed navigation and
//! stay attached for the whole session, including subpage traversal. They
//! run as spawned tasks appending to shared accumulators; the main scan flow
//! drains the accumulators only after the session is closed.

use crate::error::ScanError;
use crate::matcher;
use crate::results::NetworkMatch;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chromiumoxide::cdp::browser_protocol::network;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFinished, EventResponseReceived, GetResponseBodyParams, RequestId,
};
use chromiumoxide::cdp::js_protocol::runtime;
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, RemoteObject};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Best-effort decode of a CDP response body into text.
///
/// Returns `None` for anything that cannot be represented as UTF-8 text
/// (binary assets, truncated base64). A `None` is routine, never an error.
pub fn decode_body(body: &str, base64_encoded: bool) -> Option<String> {
    if base64_encoded {
        let bytes = BASE64.decode(body).ok()?;
        String::from_utf8(bytes).ok()
    } else {
        Some(body.to_string())
    }
}

/// Assemble a console message's text from its call arguments.
///
/// String arguments are used verbatim; other values fall back to their JSON
/// rendering or the remote object's description.
pub fn console_text(args: &[RemoteObject]) -> String {
    args.iter()
        .map(|arg| {
            if let Some(value) = &arg.value {
                match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                }
            } else if let Some(description) = &arg.description {
                description.clone()
            } else {
                String::new()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Responses whose headers have arrived but whose bodies may still be
/// loading.
///
/// CDP only guarantees a retrievable body once loading has finished, so the
/// network observer records URL and status at `responseReceived` and fetches
/// the body when the paired `loadingFinished` event arrives.
#[derive(Debug, Default)]
pub struct PendingResponses {
    inner: HashMap<RequestId, (String, i64)>,
}

impl PendingResponses {
    /// Record a response's URL and status when its headers arrive
    pub fn record(&mut self, request_id: RequestId, url: String, status: i64) {
        self.inner.insert(request_id, (url, status));
    }

    /// Take the recorded pair once the body has finished loading.
    ///
    /// Returns `None` for unknown ids and for ids already taken, so each
    /// response is observed at most once.
    pub fn finish(&mut self, request_id: &RequestId) -> Option<(String, i64)> {
        self.inner.remove(request_id)
    }
}

/// Build a network match for a decoded response body, if the body contains
/// the keyword.
pub fn match_response(url: &str, status: i64, body: &str, keyword: &str) -> Option<NetworkMatch> {
    if !matcher::contains(body, keyword) {
        return None;
    }

    Some(NetworkMatch {
        url: url.to_string(),
        status,
        matching_lines: matcher::matching_lines(body, keyword),
    })
}

/// The console and network observers attached to one scan's page.
pub struct ChannelObservers {
    console: Arc<Mutex<Vec<String>>>,
    network: Arc<Mutex<Vec<NetworkMatch>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChannelObservers {
    /// Subscribe to console and response events on `page`.
    ///
    /// Must be called before the seed navigation so no early event is missed.
    pub async fn attach(page: &Page, keyword: &str) -> Result<Self, ScanError> {
        // The Runtime and Network domains must be enabled for their events
        // to be delivered
        page.execute(runtime::EnableParams::default())
            .await
            .map_err(ScanError::ObserverAttach)?;
        page.execute(network::EnableParams::default())
            .await
            .map_err(ScanError::ObserverAttach)?;

        let console = Arc::new(Mutex::new(Vec::new()));
        let network = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = Vec::new();

        tasks.push(spawn_console_observer(page, keyword, Arc::clone(&console)).await?);
        tasks.push(spawn_network_observer(page, keyword, Arc::clone(&network)).await?);

        Ok(Self {
            console,
            network,
            tasks,
        })
    }

    /// Stop the observer tasks and drain the accumulators.
    ///
    /// Call only after the session is closed; no events can arrive after
    /// that point, so the drained collections are complete.
    pub fn finalize(self) -> (Vec<String>, Vec<NetworkMatch>) {
        for task in &self.tasks {
            task.abort();
        }

        let console = std::mem::take(&mut *self.console.lock().unwrap());
        let network = std::mem::take(&mut *self.network.lock().unwrap());
        (console, network)
    }
}

/// Spawns the task that appends matching console messages as they arrive
async fn spawn_console_observer(
    page: &Page,
    keyword: &str,
    accumulator: Arc<Mutex<Vec<String>>>,
) -> Result<JoinHandle<()>, ScanError> {
    let mut events = page
        .event_listener::<EventConsoleApiCalled>()
        .await
        .map_err(ScanError::ObserverAttach)?;
    let keyword = keyword.to_string();

    Ok(tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let text = console_text(&event.args);
            if matcher::contains(&text, &keyword) {
                ::log::debug!("Console match: {}", text);
                accumulator.lock().unwrap().push(text);
            }
        }
    }))
}

/// Spawns the task that fetches response bodies and appends matches.
///
/// Bodies are fetched only after their `loadingFinished` event, paired with
/// the earlier `responseReceived` via [`PendingResponses`]. Retrieval is
/// best-effort: a body that cannot be fetched or decoded (binary asset,
/// aborted load) is skipped with no trace. Each response is observed at most
/// once; there is no retry.
async fn spawn_network_observer(
    page: &Page,
    keyword: &str,
    accumulator: Arc<Mutex<Vec<NetworkMatch>>>,
) -> Result<JoinHandle<()>, ScanError> {
    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(ScanError::ObserverAttach)?;
    let mut finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(ScanError::ObserverAttach)?;
    let page = page.clone();
    let keyword = keyword.to_string();

    Ok(tokio::spawn(async move {
        let mut pending = PendingResponses::default();

        loop {
            tokio::select! {
                event = responses.next() => {
                    let Some(event) = event else { break };
                    pending.record(
                        event.request_id.clone(),
                        event.response.url.clone(),
                        event.response.status,
                    );
                }
                event = finished.next() => {
                    let Some(event) = event else { break };
                    let Some((url, status)) = pending.finish(&event.request_id) else {
                        continue;
                    };

                    let params = GetResponseBodyParams::new(event.request_id.clone());
                    let Ok(response) = page.execute(params).await else {
                        continue;
                    };

                    let Some(body) =
                        decode_body(&response.result.body, response.result.base64_encoded)
                    else {
                        continue;
                    };

                    if let Some(found) = match_response(&url, status, &body, &keyword) {
                        ::log::debug!("Network match in {}", found.url);
                        accumulator.lock().unwrap().push(found);
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body_plain_text() {
        assert_eq!(decode_body("hello", false), Some("hello".to_string()));
    }

    #[test]
    fn test_decode_body_base64() {
        // "line1\nfoo" base64-encoded
        assert_eq!(
            decode_body("bGluZTEKZm9v", true),
            Some("line1\nfoo".to_string())
        );
    }

    #[test]
    fn test_decode_body_invalid_base64_is_skipped() {
        assert_eq!(decode_body("!!!not base64!!!", true), None);
    }

    #[test]
    fn test_decode_body_non_utf8_is_skipped() {
        // Valid base64, but the bytes are not valid UTF-8
        let encoded = BASE64.encode([0xff, 0xfe, 0x00, 0x01]);
        assert_eq!(decode_body(&encoded, true), None);
    }

    #[test]
    fn test_match_response_collects_matching_lines() {
        let found = match_response(
            "https://example.com/data.json",
            200,
            "line1\nfoo-line2\nline3",
            "foo",
        )
        .expect("body contains the keyword");

        assert_eq!(found.url, "https://example.com/data.json");
        assert_eq!(found.status, 200);
        assert_eq!(found.matching_lines, vec!["foo-line2"]);
    }

    #[test]
    fn test_match_response_without_keyword() {
        assert!(match_response("https://example.com", 200, "nothing here", "foo").is_none());
    }

    #[test]
    fn test_pending_responses_pair_taken_once() {
        let mut pending = PendingResponses::default();
        let id = RequestId::new("req-1");
        pending.record(id.clone(), "https://example.com/data.json".to_string(), 200);

        assert_eq!(
            pending.finish(&id),
            Some(("https://example.com/data.json".to_string(), 200))
        );
        // A second loadingFinished for the same id observes nothing
        assert_eq!(pending.finish(&id), None);
    }

    #[test]
    fn test_pending_responses_unknown_id() {
        let mut pending = PendingResponses::default();
        assert_eq!(pending.finish(&RequestId::new("req-404")), None);
    }

    fn remote_object(json: serde_json::Value) -> RemoteObject {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_console_text_mixes_values_and_descriptions() {
        let string_arg =
            remote_object(serde_json::json!({"type": "string", "value": "keyword spotted"}));
        let number_arg = remote_object(serde_json::json!({"type": "number", "value": 42}));
        let object_arg =
            remote_object(serde_json::json!({"type": "object", "description": "Object"}));

        let text = console_text(&[string_arg, number_arg, object_arg]);
        assert_eq!(text, "keyword spotted 42 Object");
    }
}
