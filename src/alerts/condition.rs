//! Typed representation of an alert's stored `(type, config)` pair.
//!
//! Config documents are small JSON objects (`{"daysAhead": 2}`); a missing
//! key falls back to the per-type default of 1. Anything malformed rejects
//! the alert as a whole — the engine treats that as "never matches".

use serde_json::Value;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertCondition {
    /// An earnings report lands exactly `days_ahead` days from today.
    Earnings { days_ahead: i64 },
    /// Any Form 4 filing for the symbol inside the trailing `last_days` window.
    Insider { last_days: i64 },
    /// The symbol goes ex-dividend exactly `days_ahead` days from today.
    Dividend { days_ahead: i64 },
}

impl AlertCondition {
    pub fn parse(alert_type: &str, config_raw: &str) -> Result<Self> {
        let config: Value = serde_json::from_str(config_raw)
            .map_err(|e| AppError::InvalidConfig(format!("config is not valid JSON: {e}")))?;
        if !config.is_object() {
            return Err(AppError::InvalidConfig("config must be a JSON object".into()));
        }

        match alert_type {
            "earnings" => Ok(AlertCondition::Earnings {
                days_ahead: int_key(&config, "daysAhead")?,
            }),
            "insider" => Ok(AlertCondition::Insider {
                last_days: int_key(&config, "lastDays")?,
            }),
            "dividend" => Ok(AlertCondition::Dividend {
                days_ahead: int_key(&config, "daysAhead")?,
            }),
            other => Err(AppError::InvalidConfig(format!("unknown alert type '{other}'"))),
        }
    }
}

fn int_key(config: &Value, key: &str) -> Result<i64> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(1),
        Some(v) => v
            .as_i64()
            .filter(|n| *n >= 0)
            .ok_or_else(|| AppError::InvalidConfig(format!("{key} must be a non-negative integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_one_day() {
        assert_eq!(
            AlertCondition::parse("earnings", "{}").unwrap(),
            AlertCondition::Earnings { days_ahead: 1 }
        );
        assert_eq!(
            AlertCondition::parse("insider", "{}").unwrap(),
            AlertCondition::Insider { last_days: 1 }
        );
        assert_eq!(
            AlertCondition::parse("dividend", "{}").unwrap(),
            AlertCondition::Dividend { days_ahead: 1 }
        );
    }

    #[test]
    fn explicit_values_override_defaults() {
        assert_eq!(
            AlertCondition::parse("earnings", r#"{"daysAhead": 3}"#).unwrap(),
            AlertCondition::Earnings { days_ahead: 3 }
        );
        assert_eq!(
            AlertCondition::parse("insider", r#"{"lastDays": 7}"#).unwrap(),
            AlertCondition::Insider { last_days: 7 }
        );
    }

    #[test]
    fn irrelevant_keys_are_ignored() {
        assert_eq!(
            AlertCondition::parse("dividend", r#"{"lastDays": 9}"#).unwrap(),
            AlertCondition::Dividend { days_ahead: 1 }
        );
    }

    #[test]
    fn unknown_type_rejected() {
        let err = AlertCondition::parse("momentum", "{}").unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_config_rejected() {
        for bad in ["not json", "[]", r#"{"daysAhead": "soon"}"#, r#"{"daysAhead": -1}"#] {
            let err = AlertCondition::parse("earnings", bad).unwrap_err();
            assert!(matches!(err, AppError::InvalidConfig(_)), "{bad}");
        }
    }
}
