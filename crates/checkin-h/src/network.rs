//! Response interception for the check-in API call.

use base64::Engine;
use checkin_engine::backend::{BackendError, ResponseWatch};
use checkin_engine::protocol::ResponseSnapshot;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventLoadingFailed, EventLoadingFinished, EventResponseReceived,
    GetResponseBodyParams, RequestId,
};
use futures::StreamExt;
use std::collections::HashSet;

/// A matched response, keyed by its DevTools request id.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Matched {
    request_id: String,
    url: String,
    status: u16,
}

/// A matched response whose loading is over.
#[derive(Debug, PartialEq, Eq)]
enum Completed {
    /// The body can be fetched.
    Loaded(Matched),
    /// The request failed after its headers arrived.
    Failed(Matched),
}

/// Pairs `responseReceived` with `loadingFinished` / `loadingFailed`.
///
/// The three events come from separate listener streams, so a request may
/// be reported finished before its response is seen. Such ids are kept
/// until the response shows up.
#[derive(Debug)]
struct ResponseTracker {
    pattern: String,
    pending: Vec<Matched>,
    loaded_early: HashSet<String>,
    failed_early: HashSet<String>,
}

impl ResponseTracker {
    fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            pending: Vec::new(),
            loaded_early: HashSet::new(),
            failed_early: HashSet::new(),
        }
    }

    fn on_response(&mut self, request_id: &str, url: &str, status: i64) -> Option<Completed> {
        if !url.contains(&self.pattern) {
            self.loaded_early.remove(request_id);
            self.failed_early.remove(request_id);
            return None;
        }
        tracing::debug!("Matched response {} ({})", url, status);
        let matched = Matched {
            request_id: request_id.to_string(),
            url: url.to_string(),
            status: u16::try_from(status).unwrap_or(0),
        };
        if self.loaded_early.remove(request_id) {
            return Some(Completed::Loaded(matched));
        }
        if self.failed_early.remove(request_id) {
            return Some(Completed::Failed(matched));
        }
        self.pending.push(matched);
        None
    }

    fn on_finished(&mut self, request_id: &str) -> Option<Completed> {
        match self.take(request_id) {
            Some(matched) => Some(Completed::Loaded(matched)),
            None => {
                self.loaded_early.insert(request_id.to_string());
                None
            }
        }
    }

    fn on_failed(&mut self, request_id: &str) -> Option<Completed> {
        match self.take(request_id) {
            Some(matched) => Some(Completed::Failed(matched)),
            None => {
                self.failed_early.insert(request_id.to_string());
                None
            }
        }
    }

    /// Latest match whose body never finished loading.
    fn unfinished(mut self) -> Option<Matched> {
        self.pending.pop()
    }

    fn take(&mut self, request_id: &str) -> Option<Matched> {
        let index = self.pending.iter().position(|p| p.request_id == request_id)?;
        Some(self.pending.remove(index))
    }
}

/// Subscribe to responses whose URL contains `url_contains`.
///
/// The listener runs on its own task. Each matched response replaces the
/// previous one; the final value is delivered when the watch is finished.
pub async fn watch_responses(
    page: &Page,
    url_contains: &str,
) -> Result<ResponseWatch, BackendError> {
    page.execute(EnableParams::default())
        .await
        .map_err(|e| BackendError::Other(format!("Failed to enable network domain: {}", e)))?;

    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(subscribe_error)?;
    let mut finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(subscribe_error)?;
    let mut failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(subscribe_error)?;

    let (mut slot, watch) = ResponseWatch::pair();
    let page = page.clone();
    let mut tracker = ResponseTracker::new(url_contains);
    tokio::spawn(async move {
        let mut latest: Option<ResponseSnapshot> = None;

        loop {
            // Responses first, so queued completions find their request.
            let completed = tokio::select! {
                biased;
                Some(event) = responses.next() => tracker.on_response(
                    event.request_id.inner(),
                    &event.response.url,
                    event.response.status,
                ),
                Some(event) = finished.next() => tracker.on_finished(event.request_id.inner()),
                Some(event) = failed.next() => {
                    tracing::debug!("Request failed: {}", event.error_text);
                    tracker.on_failed(event.request_id.inner())
                }
                _ = slot.stopped() => break,
                else => break,
            };

            match completed {
                Some(Completed::Loaded(done)) => {
                    let body = fetch_body(&page, RequestId::new(done.request_id)).await;
                    latest = Some(ResponseSnapshot::new(done.url, done.status, body));
                }
                Some(Completed::Failed(done)) => {
                    latest = Some(ResponseSnapshot::new(done.url, done.status, None));
                }
                None => {}
            }
        }

        // Headers arrived but the body never did: keep what is known.
        if latest.is_none()
            && let Some(last) = tracker.unfinished()
        {
            latest = Some(ResponseSnapshot::new(last.url, last.status, None));
        }
        slot.fill(latest);
    });
    Ok(watch)
}

fn subscribe_error(e: impl std::fmt::Display) -> BackendError {
    BackendError::Other(format!("Failed to subscribe to network events: {}", e))
}

async fn fetch_body(page: &Page, request_id: RequestId) -> Option<String> {
    let response = match page.execute(GetResponseBodyParams::new(request_id)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Response body unavailable: {}", e);
            return None;
        }
    };
    if !response.result.base64_encoded {
        return Some(response.result.body.clone());
    }
    match base64::engine::general_purpose::STANDARD.decode(&response.result.body) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            tracing::debug!("Failed to decode response body: {}", e);
            None
        }
    }
}
