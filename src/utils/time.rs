use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub fn from_rfc3339(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// Human-readable UTC rendering used in emails, e.g. "Mon, Jan 1 2024 at 10:00 UTC".
pub fn to_display(dt: DateTime<Utc>) -> String {
    dt.format("%a, %b %-d %Y at %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format_is_stable() {
        let dt = from_rfc3339("2024-01-01T10:00:00Z").unwrap();
        assert_eq!(to_display(dt), "Mon, Jan 1 2024 at 10:00 UTC");
        assert_eq!(to_rfc3339(dt), "2024-01-01T10:00:00+00:00");
    }
}
