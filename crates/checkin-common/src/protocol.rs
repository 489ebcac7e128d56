use serde::{Deserialize, Serialize};
use std::fmt;

/// One intercepted network exchange, captured as classification evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub url: String,
    pub status: u16,
    #[serde(default)]
    pub body: Option<String>,
}

impl ResponseSnapshot {
    pub fn new(url: impl Into<String>, status: u16, body: Option<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body,
        }
    }

    /// Body text, treating a missing body as empty.
    pub fn body_text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SigninStatus {
    Success,
    Already,
    Failure,
}

impl SigninStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigninStatus::Success => "success",
            SigninStatus::Already => "already",
            SigninStatus::Failure => "failure",
        }
    }

    /// `success` and `already` both mean the day's check-in is done.
    pub fn is_done(&self) -> bool {
        !matches!(self, SigninStatus::Failure)
    }
}

impl fmt::Display for SigninStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure taxonomy recorded with every failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Session artifact missing or rejected by the site.
    AuthInvalid,
    /// Automation runtime unavailable.
    DependencyMissing,
    /// The endpoint answered but reported failure.
    Http,
    /// A configured failure keyword was found on the page.
    DomFailure,
    Unknown,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::AuthInvalid => "auth_invalid",
            ErrorCategory::DependencyMissing => "dependency_missing",
            ErrorCategory::Http => "http",
            ErrorCategory::DomFailure => "dom_failure",
            ErrorCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single result of one sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigninOutcome {
    pub status: SigninStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ResponseSnapshot>,
}

impl SigninOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: SigninStatus::Success,
            message: message.into(),
            error_category: None,
            error_summary: None,
            http_status: None,
            snapshot: None,
        }
    }

    pub fn already(message: impl Into<String>) -> Self {
        Self {
            status: SigninStatus::Already,
            ..Self::success(message)
        }
    }

    pub fn failure(
        category: ErrorCategory,
        message: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            status: SigninStatus::Failure,
            message: message.into(),
            error_category: Some(category),
            error_summary: Some(summary.into()),
            http_status: None,
            snapshot: None,
        }
    }

    /// Attach the response the outcome was derived from.
    pub fn with_snapshot(mut self, snapshot: &ResponseSnapshot) -> Self {
        self.http_status = Some(snapshot.status);
        self.snapshot = Some(snapshot.clone());
        self
    }
}
