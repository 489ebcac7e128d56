//! Outcome classification.
//!
//! Turns what an attempt observed (an intercepted response, the rendered
//! page text, or neither) into exactly one [`SigninOutcome`]. Rules are
//! evaluated in a fixed order and the first match wins:
//!
//! 1. A response from an unexpected endpoint is never trusted.
//! 2. A response is read as: already-keyword in body, then a JSON success
//!    key with a truthy token, then a JSON success key whose value carries an
//!    already-keyword, then a success key anywhere in the raw body, else an
//!    HTTP failure.
//! 3. Without a response, page text is matched against the success, already
//!    and failure keyword sets in that order. Unmatched text is a failure so
//!    an unreadable page never reports success.
//!
//! All matching is case-insensitive substring containment.

use crate::config::schema::{ApiRules, DomRules, SelectorRules};
use checkin_common::protocol::{ErrorCategory, ResponseSnapshot, SigninOutcome};
use serde_json::Value;

/// Values of a success key that count as success.
const TRUTHY_TOKENS: &[&str] = &["true", "ok", "success"];

pub const UNEXPECTED_ENDPOINT: &str = "Unexpected API endpoint";
pub const NO_EVIDENCE: &str = "No API response and no DOM keywords";

pub fn classify(
    snapshot: Option<&ResponseSnapshot>,
    page_text: Option<&str>,
    rules: &SelectorRules,
) -> SigninOutcome {
    match snapshot {
        Some(snapshot) => classify_response(snapshot, &rules.api),
        None => classify_page(page_text.unwrap_or_default(), &rules.dom),
    }
}

fn classify_response(snapshot: &ResponseSnapshot, rules: &ApiRules) -> SigninOutcome {
    if let Some(expected) = &rules.checkin_url_contains
        && !snapshot.url.contains(expected.as_str())
    {
        return SigninOutcome::failure(
            ErrorCategory::Unknown,
            UNEXPECTED_ENDPOINT,
            format!("{}: {}", UNEXPECTED_ENDPOINT, snapshot.url),
        )
        .with_snapshot(snapshot);
    }

    let body = snapshot.body_text();

    if match_any_keyword(body, &rules.already_keywords).is_some() {
        return SigninOutcome::already("Already checked in today").with_snapshot(snapshot);
    }

    let values = success_key_values(body, &rules.success_keys);

    if values
        .iter()
        .any(|v| TRUTHY_TOKENS.contains(&v.to_lowercase().as_str()))
    {
        return SigninOutcome::success("Check-in succeeded").with_snapshot(snapshot);
    }

    if values
        .iter()
        .any(|v| match_any_keyword(v, &rules.already_keywords).is_some())
    {
        return SigninOutcome::already("Already checked in today").with_snapshot(snapshot);
    }

    if match_any_keyword(body, &rules.success_keys).is_some() {
        return SigninOutcome::success("Check-in succeeded").with_snapshot(snapshot);
    }

    SigninOutcome::failure(ErrorCategory::Http, "API response indicates failure", body)
        .with_snapshot(snapshot)
}

fn classify_page(text: &str, rules: &DomRules) -> SigninOutcome {
    if match_any_keyword(text, &rules.success_keywords).is_some() {
        return SigninOutcome::success("Check-in success (DOM)");
    }
    if match_any_keyword(text, &rules.already_keywords).is_some() {
        return SigninOutcome::already("Already checked in (DOM)");
    }
    if let Some(keyword) = match_any_keyword(text, &rules.failure_keywords) {
        return SigninOutcome::failure(
            ErrorCategory::DomFailure,
            "Detected failure message on page",
            format!("failure keyword detected: {}", keyword),
        );
    }
    SigninOutcome::failure(
        ErrorCategory::Unknown,
        "Unable to determine outcome",
        NO_EVIDENCE,
    )
}

/// Text form of each success key's value, when `body` is a JSON object.
///
/// Missing keys read as empty, strings as their contents, everything else as
/// its JSON rendering. A body that is not a JSON object yields nothing.
fn success_key_values(body: &str, keys: &[String]) -> Vec<String> {
    let Ok(Value::Object(payload)) = serde_json::from_str::<Value>(body) else {
        return Vec::new();
    };
    keys.iter()
        .map(|key| match payload.get(key) {
            // Null reads like a missing key, not as a literal word.
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        })
        .collect()
}

/// First keyword found in `text`, ignoring case.
///
/// An empty keyword matches any text; the config loader removes blank
/// entries before rules reach this point.
pub fn match_any_keyword<'k>(text: &str, keywords: &'k [String]) -> Option<&'k str> {
    if keywords.is_empty() {
        return None;
    }
    let lowered = text.to_lowercase();
    keywords
        .iter()
        .find(|k| lowered.contains(&k.to_lowercase()))
        .map(String::as_str)
}
