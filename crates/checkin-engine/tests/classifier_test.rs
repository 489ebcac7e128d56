use checkin_engine::classifier::{NO_EVIDENCE, UNEXPECTED_ENDPOINT, classify};
use checkin_engine::config::{ApiRules, DomRules, SelectorRules};
use checkin_engine::protocol::{ErrorCategory, ResponseSnapshot, SigninStatus};

fn kw(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn api_rules(url: Option<&str>, success_keys: &[&str], already: &[&str]) -> SelectorRules {
    SelectorRules {
        dom: DomRules::default(),
        api: ApiRules {
            checkin_url_contains: url.map(str::to_string),
            success_keys: kw(success_keys),
            already_keywords: kw(already),
        },
    }
}

fn dom_rules(success: &[&str], already: &[&str], failure: &[&str]) -> SelectorRules {
    SelectorRules {
        dom: DomRules {
            login_marker: None,
            checkin_button: None,
            success_keywords: kw(success),
            already_keywords: kw(already),
            failure_keywords: kw(failure),
        },
        api: ApiRules::default(),
    }
}

fn snap(url: &str, status: u16, body: &str) -> ResponseSnapshot {
    ResponseSnapshot::new(url, status, Some(body.to_string()))
}

// ============================================================================
// API response rules
// ============================================================================

#[test]
fn json_success_code_is_success() {
    let rules = api_rules(Some("/checkin"), &["code"], &[]);
    let snapshot = snap("https://anyrouter.top/api/user/checkin", 200, r#"{"code":"success"}"#);

    let outcome = classify(Some(&snapshot), None, &rules);

    assert_eq!(outcome.status, SigninStatus::Success);
    assert_eq!(outcome.http_status, Some(200));
    assert_eq!(outcome.snapshot.as_ref(), Some(&snapshot));
    assert_eq!(outcome.error_category, None);
}

#[test]
fn already_keyword_in_raw_body_is_already() {
    let rules = api_rules(None, &[], &["already checked in"]);
    let snapshot = snap("https://x/api/checkin", 200, "already checked in today");

    let outcome = classify(Some(&snapshot), None, &rules);

    assert_eq!(outcome.status, SigninStatus::Already);
    assert_eq!(outcome.message, "Already checked in today");
}

#[test]
fn unexpected_endpoint_is_unknown_failure_regardless_of_body() {
    let rules = api_rules(Some("/checkin"), &["success"], &["already"]);
    for body in [
        r#"{"success": true}"#,
        "already checked in",
        "success",
        "",
    ] {
        let snapshot = snap("https://anyrouter.top/api/user/self", 200, body);
        let outcome = classify(Some(&snapshot), Some("signed in successfully"), &rules);
        assert_eq!(outcome.status, SigninStatus::Failure, "body {:?}", body);
        assert_eq!(outcome.error_category, Some(ErrorCategory::Unknown));
        assert_eq!(outcome.message, UNEXPECTED_ENDPOINT);
    }
}

#[test]
fn truthy_tokens_are_case_insensitive() {
    let rules = api_rules(None, &["success", "status"], &[]);
    for body in [
        r#"{"success": true}"#,
        r#"{"success": "True"}"#,
        r#"{"status": "OK"}"#,
        r#"{"status": "Success"}"#,
    ] {
        let outcome = classify(Some(&snap("https://x/checkin", 200, body)), None, &rules);
        assert_eq!(outcome.status, SigninStatus::Success, "body {}", body);
    }
}

#[test]
fn raw_already_keyword_beats_json_success() {
    let rules = api_rules(None, &["success"], &["already"]);
    let body = r#"{"success": true, "message": "Already signed in"}"#;

    let outcome = classify(Some(&snap("https://x/checkin", 200, body)), None, &rules);

    assert_eq!(outcome.status, SigninStatus::Already);
}

#[test]
fn success_key_value_with_already_keyword_is_already() {
    // Escaped in the raw body, so only the parsed value carries the keyword.
    let rules = api_rules(None, &["message"], &["已签到"]);
    let body = r#"{"message": "\u5df2\u7b7e\u5230"}"#;

    let outcome = classify(Some(&snap("https://x/checkin", 200, body)), None, &rules);

    assert_eq!(outcome.status, SigninStatus::Already);
}

#[test]
fn json_falsy_value_falls_through_to_raw_substring() {
    let rules = api_rules(None, &["success"], &[]);
    let body = r#"{"success": false, "message": "quota"}"#;

    let outcome = classify(Some(&snap("https://x/checkin", 200, body)), None, &rules);

    // "success" appears as a key name in the raw body.
    assert_eq!(outcome.status, SigninStatus::Success);
}

#[test]
fn plain_text_body_with_success_key_is_success() {
    let rules = api_rules(None, &["SIGNED"], &[]);
    let outcome = classify(
        Some(&snap("https://x/checkin", 200, "you are signed for today")),
        None,
        &rules,
    );
    assert_eq!(outcome.status, SigninStatus::Success);
}

#[test]
fn unmatched_body_is_http_failure_with_body_summary() {
    let rules = api_rules(Some("checkin"), &["ret"], &["already"]);
    let body = r#"{"error": "rate limited"}"#;

    let outcome = classify(Some(&snap("https://x/checkin", 429, body)), None, &rules);

    assert_eq!(outcome.status, SigninStatus::Failure);
    assert_eq!(outcome.error_category, Some(ErrorCategory::Http));
    assert_eq!(outcome.error_summary.as_deref(), Some(body));
    assert_eq!(outcome.http_status, Some(429));
    assert_eq!(outcome.message, "API response indicates failure");
}

#[test]
fn missing_body_is_http_failure() {
    let rules = api_rules(None, &["success"], &["already"]);
    let snapshot = ResponseSnapshot::new("https://x/checkin", 204, None);

    let outcome = classify(Some(&snapshot), None, &rules);

    assert_eq!(outcome.error_category, Some(ErrorCategory::Http));
    assert_eq!(outcome.error_summary.as_deref(), Some(""));
}

#[test]
fn snapshot_takes_precedence_over_page_text() {
    let mut rules = api_rules(None, &[], &[]);
    rules.dom.success_keywords = kw(&["signed in successfully"]);
    let snapshot = snap("https://x/checkin", 500, "oops");

    let outcome = classify(Some(&snapshot), Some("signed in successfully"), &rules);

    assert_eq!(outcome.error_category, Some(ErrorCategory::Http));
}

// ============================================================================
// DOM fallback
// ============================================================================

#[test]
fn dom_success_keyword() {
    let rules = dom_rules(&["signed in successfully"], &[], &[]);
    let outcome = classify(None, Some("Hello! You SIGNED IN SUCCESSFULLY."), &rules);
    assert_eq!(outcome.status, SigninStatus::Success);
    assert_eq!(outcome.message, "Check-in success (DOM)");
    assert_eq!(outcome.http_status, None);
}

#[test]
fn dom_order_is_success_then_already_then_failure() {
    let rules = dom_rules(&["done"], &["done"], &["done"]);
    assert_eq!(classify(None, Some("done"), &rules).status, SigninStatus::Success);

    let rules = dom_rules(&[], &["done"], &["done"]);
    assert_eq!(classify(None, Some("done"), &rules).status, SigninStatus::Already);

    let rules = dom_rules(&[], &[], &["done"]);
    let outcome = classify(None, Some("done"), &rules);
    assert_eq!(outcome.error_category, Some(ErrorCategory::DomFailure));
    assert_eq!(
        outcome.error_summary.as_deref(),
        Some("failure keyword detected: done")
    );
}

#[test]
fn no_keywords_matched_is_unknown_failure() {
    let rules = dom_rules(&["signed in"], &["already"], &["error"]);
    let outcome = classify(None, Some("Welcome to the dashboard"), &rules);
    assert_eq!(outcome.status, SigninStatus::Failure);
    assert_eq!(outcome.error_category, Some(ErrorCategory::Unknown));
    assert_eq!(outcome.error_summary.as_deref(), Some(NO_EVIDENCE));
}

#[test]
fn no_snapshot_and_no_text_is_unknown_failure() {
    let rules = dom_rules(&["signed in"], &[], &[]);
    let outcome = classify(None, None, &rules);
    assert_eq!(outcome.error_category, Some(ErrorCategory::Unknown));
}

#[test]
fn empty_rule_lists_never_match() {
    let outcome = classify(None, Some("anything at all"), &SelectorRules::default());
    assert_eq!(outcome.error_summary.as_deref(), Some(NO_EVIDENCE));
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn classification_is_idempotent() {
    let rules = api_rules(Some("checkin"), &["ret", "success"], &["already"]);
    let snapshot = snap("https://x/checkin", 200, r#"{"ret": 1, "msg": "fine"}"#);

    let first = classify(Some(&snapshot), Some("page"), &rules);
    let second = classify(Some(&snapshot), Some("page"), &rules);

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}
