use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;

/// Current wall-clock time in the named IANA zone.
///
/// Unknown zone names fall back to UTC; configuration loading rejects them
/// before they get here.
pub fn now_local(timezone: &str) -> DateTime<FixedOffset> {
    let now = Utc::now();
    match timezone.parse::<Tz>() {
        Ok(tz) => now.with_timezone(&tz).fixed_offset(),
        Err(_) => {
            tracing::warn!("Unknown timezone {:?}, using UTC", timezone);
            now.fixed_offset()
        }
    }
}

/// ISO-8601 timestamp with offset, as written to the ledger.
pub fn timestamp(timezone: &str) -> String {
    now_local(timezone).to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singapore_offset_is_plus_eight() {
        let ts = timestamp("Asia/Singapore");
        assert!(ts.ends_with("+08:00"), "{}", ts);
    }

    #[test]
    fn unknown_zone_falls_back_to_utc() {
        let ts = timestamp("Mars/Olympus");
        assert!(ts.ends_with("+00:00"), "{}", ts);
    }
}
