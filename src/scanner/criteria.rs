//! Typed representation of a scanner's stored criteria document.
//!
//! The document is JSON at rest: `{"dividendYield": {"operator": ">=",
//! "value": 0.5}, "insiderBuysLastDays": 30}`. Unknown keys are ignored for
//! forward compatibility; malformed values for a recognized key reject the
//! whole document before any results are touched.

use serde_json::Value;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
}

impl CmpOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "<" => Some(CmpOp::Lt),
            ">" => Some(CmpOp::Gt),
            "<=" => Some(CmpOp::Le),
            ">=" => Some(CmpOp::Ge),
            "=" => Some(CmpOp::Eq),
            _ => None,
        }
    }

    pub fn matches(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YieldFilter {
    pub op: CmpOp,
    pub value: f64,
}

/// Per-ticker facts the predicates are evaluated against. Computed by the
/// engine for exactly the criteria present in the document.
#[derive(Debug, Clone, Default)]
pub struct TickerFacts {
    /// AVG(amount) over every stored dividend record, None when the ticker
    /// has no dividend history.
    pub avg_dividend_amount: Option<f64>,
    /// Count of "Buy" Form 4 filings inside the criteria's trailing window.
    pub buy_filings_in_window: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScannerCriteria {
    pub dividend_yield: Option<YieldFilter>,
    pub insider_buys_last_days: Option<i64>,
}

impl ScannerCriteria {
    pub fn from_str(raw: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(raw)
            .map_err(|e| AppError::InvalidCriteria(format!("not valid JSON: {e}")))?;
        Self::parse(&doc)
    }

    pub fn parse(doc: &Value) -> Result<Self> {
        let obj = doc
            .as_object()
            .ok_or_else(|| AppError::InvalidCriteria("document must be a JSON object".into()))?;

        let mut criteria = ScannerCriteria::default();

        // JSON null for a recognized key is treated as key-absent.
        if let Some(v) = obj.get("dividendYield").filter(|v| !v.is_null()) {
            criteria.dividend_yield = Some(parse_yield_filter(v)?);
        }
        if let Some(v) = obj.get("insiderBuysLastDays").filter(|v| !v.is_null()) {
            let days = v.as_i64().ok_or_else(|| {
                AppError::InvalidCriteria("insiderBuysLastDays must be an integer".into())
            })?;
            if days < 1 {
                return Err(AppError::InvalidCriteria(
                    "insiderBuysLastDays must be >= 1".into(),
                ));
            }
            criteria.insider_buys_last_days = Some(days);
        }

        Ok(criteria)
    }

    /// No recognized criteria present: the scanner matches every ticker.
    pub fn is_empty(&self) -> bool {
        self.dividend_yield.is_none() && self.insider_buys_last_days.is_none()
    }

    /// AND of every present predicate.
    pub fn matches(&self, facts: &TickerFacts) -> bool {
        if let Some(filter) = &self.dividend_yield {
            // A ticker with no dividend history has no average to compare.
            match facts.avg_dividend_amount {
                Some(avg) if filter.op.matches(avg, filter.value) => {}
                _ => return false,
            }
        }
        if self.insider_buys_last_days.is_some() && facts.buy_filings_in_window == 0 {
            return false;
        }
        true
    }
}

fn parse_yield_filter(v: &Value) -> Result<YieldFilter> {
    let obj = v
        .as_object()
        .ok_or_else(|| AppError::InvalidCriteria("dividendYield must be an object".into()))?;
    let op = obj
        .get("operator")
        .and_then(Value::as_str)
        .and_then(CmpOp::parse)
        .ok_or_else(|| {
            AppError::InvalidCriteria("dividendYield.operator must be one of <, >, <=, >=, =".into())
        })?;
    let value = obj.get("value").and_then(Value::as_f64).ok_or_else(|| {
        AppError::InvalidCriteria("dividendYield.value must be a number".into())
    })?;
    Ok(YieldFilter { op, value })
}
