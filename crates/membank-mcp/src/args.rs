//! Argument extraction helpers for tool handlers.

use chrono::NaiveDate;
use membank_core::MemBankError;
use serde_json::Value;

pub(crate) fn require_str(args: &Value, key: &str) -> Result<String, MemBankError> {
    match args.get(key).and_then(|v| v.as_str()) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(MemBankError::InvalidArgument(format!(
            "missing or empty '{key}' parameter"
        ))),
    }
}

pub(crate) fn opt_str(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

pub(crate) fn opt_bool(args: &Value, key: &str) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

pub(crate) fn opt_usize(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(|v| v.as_u64()).map(|v| v as usize)
}

pub(crate) fn opt_i64(args: &Value, key: &str) -> Option<i64> {
    args.get(key).and_then(|v| v.as_i64())
}

pub(crate) fn str_list(args: &Value, key: &str) -> Vec<String> {
    args.get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn require_date(args: &Value, key: &str) -> Result<NaiveDate, MemBankError> {
    parse_date(&require_str(args, key)?, key)
}

pub(crate) fn opt_date(args: &Value, key: &str) -> Result<Option<NaiveDate>, MemBankError> {
    opt_str(args, key).map(|s| parse_date(&s, key)).transpose()
}

fn parse_date(raw: &str, key: &str) -> Result<NaiveDate, MemBankError> {
    raw.parse().map_err(|_| {
        MemBankError::InvalidArgument(format!("'{key}' must be an ISO date (YYYY-MM-DD), got '{raw}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn require_str_rejects_missing_and_empty() {
        let args = json!({"a": "x", "b": ""});
        assert_eq!(require_str(&args, "a").unwrap(), "x");
        assert!(require_str(&args, "b").is_err());
        assert!(require_str(&args, "c").is_err());
    }

    #[test]
    fn date_parsing() {
        let args = json!({"date": "2025-03-01", "bad": "03/01/2025"});
        assert_eq!(
            require_date(&args, "date").unwrap().to_string(),
            "2025-03-01"
        );
        assert!(require_date(&args, "bad").is_err());
        assert!(opt_date(&args, "missing").unwrap().is_none());
    }

    #[test]
    fn list_and_scalars() {
        let args = json!({"tags": ["a", "b"], "n": 3, "flag": true});
        assert_eq!(str_list(&args, "tags"), vec!["a", "b"]);
        assert!(str_list(&args, "missing").is_empty());
        assert_eq!(opt_usize(&args, "n"), Some(3));
        assert!(opt_bool(&args, "flag"));
        assert!(!opt_bool(&args, "missing"));
    }
}
