use checkin_common::protocol::SigninOutcome;
use serde_json::Value;

/// Ledger columns, in stored order.
pub const HISTORY_HEADERS: [&str; 9] = [
    "timestamp",
    "slot",
    "stage",
    "result",
    "err_category",
    "err_summary",
    "http_status",
    "duration_ms",
    "extra",
];

/// One ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub slot: Option<String>,
    pub stage: String,
    pub result: String,
    pub err_category: Option<String>,
    pub err_summary: Option<String>,
    pub http_status: Option<u16>,
    pub duration_ms: Option<u64>,
    pub extra: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
#[error("column {column}: {reason}")]
pub struct RowError {
    pub column: &'static str,
    pub reason: String,
}

impl HistoryEntry {
    pub fn new(
        timestamp: impl Into<String>,
        slot: Option<&str>,
        stage: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            slot: slot.map(str::to_string),
            stage: stage.into(),
            result: result.into(),
            err_category: None,
            err_summary: None,
            http_status: None,
            duration_ms: None,
            extra: None,
        }
    }

    /// Entry mirroring a sign-in outcome.
    pub fn from_outcome(timestamp: impl Into<String>, slot: &str, outcome: &SigninOutcome) -> Self {
        Self {
            err_category: outcome.error_category.map(|c| c.as_str().to_string()),
            err_summary: Some(
                outcome
                    .error_summary
                    .clone()
                    .unwrap_or_else(|| outcome.message.clone()),
            ),
            http_status: outcome.http_status,
            ..Self::new(timestamp, Some(slot), "signin", outcome.status.as_str())
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.err_summary = Some(summary.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Text cells in [`HISTORY_HEADERS`] order; absent fields are empty.
    pub fn to_row(&self) -> Result<Vec<String>, serde_json::Error> {
        let extra = match &self.extra {
            Some(value) if !value.is_null() => serde_json::to_string(&sorted(value))?,
            _ => String::new(),
        };
        Ok(vec![
            self.timestamp.clone(),
            self.slot.clone().unwrap_or_default(),
            self.stage.clone(),
            self.result.clone(),
            self.err_category.clone().unwrap_or_default(),
            self.err_summary.clone().unwrap_or_default(),
            self.http_status.map(|s| s.to_string()).unwrap_or_default(),
            self.duration_ms.map(|d| d.to_string()).unwrap_or_default(),
            extra,
        ])
    }

    pub fn from_row(row: &csv::StringRecord) -> Result<Self, RowError> {
        let cell = |i: usize| row.get(i).unwrap_or_default();
        let optional = |i: usize| Some(cell(i)).filter(|v| !v.is_empty()).map(str::to_string);

        Ok(Self {
            timestamp: cell(0).to_string(),
            slot: optional(1),
            stage: cell(2).to_string(),
            result: cell(3).to_string(),
            err_category: optional(4),
            err_summary: optional(5),
            http_status: parse_number(cell(6), "http_status")?,
            duration_ms: parse_number(cell(7), "duration_ms")?,
            extra: match cell(8) {
                "" => None,
                text => Some(serde_json::from_str(text).map_err(|e| RowError {
                    column: "extra",
                    reason: e.to_string(),
                })?),
            },
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    text: &str,
    column: &'static str,
) -> Result<Option<T>, RowError>
where
    T::Err: std::fmt::Display,
{
    if text.is_empty() {
        return Ok(None);
    }
    text.parse().map(Some).map_err(|e: T::Err| RowError {
        column,
        reason: format!("{:?}: {}", text, e),
    })
}

/// Rebuild `value` with object keys in sorted order at every depth.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            Value::Object(
                keys.into_iter()
                    .map(|k| (k.clone(), sorted(&map[k])))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}
