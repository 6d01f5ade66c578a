//! Loose date parsing and `<op> <date>` comparison expressions

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

use crate::api::error::ApiError;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const ZONED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f %z"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%b-%Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%b %d %Y",
    "%Y/%m/%d",
];

/// A parsed date and whether it carried a time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub when: DateTime<Utc>,
    pub date_only: bool,
}

/// Parses the date formats vCD and users commonly write.
///
/// Values without a zone are taken as UTC.
pub fn parse_date(input: &str) -> Result<ParsedDate, ApiError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(ParsedDate {
            when: dt.with_timezone(&Utc),
            date_only: false,
        });
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(input, format) {
            return Ok(ParsedDate {
                when: dt.with_timezone(&Utc),
                date_only: false,
            });
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Ok(ParsedDate {
            when: dt.with_timezone(&Utc),
            date_only: false,
        });
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(ParsedDate {
                when: dt.and_utc(),
                date_only: false,
            });
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(input, format) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(ParsedDate {
                    when: dt.and_utc(),
                    date_only: true,
                });
            }
        }
    }

    Err(ApiError::FilterError(format!(
        "unrecognized date '{}'",
        input
    )))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
}

impl DateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateOp::Gt => ">",
            DateOp::Ge => ">=",
            DateOp::Lt => "<",
            DateOp::Le => "<=",
            DateOp::Eq => "==",
        }
    }
}

/// `<op> <date>`, e.g. `>= 2023-01-01` or `< 2023-02-01T12:00:00Z`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateExpr {
    pub op: DateOp,
    pub date: ParsedDate,
    raw: String,
}

impl DateExpr {
    pub fn parse(expression: &str) -> Result<Self, ApiError> {
        let expr = expression.trim();
        // two-character operators first
        let (op, rest) = if let Some(rest) = expr.strip_prefix(">=") {
            (DateOp::Ge, rest)
        } else if let Some(rest) = expr.strip_prefix("<=") {
            (DateOp::Le, rest)
        } else if let Some(rest) = expr.strip_prefix("==") {
            (DateOp::Eq, rest)
        } else if let Some(rest) = expr.strip_prefix('>') {
            (DateOp::Gt, rest)
        } else if let Some(rest) = expr.strip_prefix('<') {
            (DateOp::Lt, rest)
        } else {
            return Err(ApiError::FilterError(format!(
                "date expression '{}' must start with one of > >= < <= ==",
                expression
            )));
        };

        let date = parse_date(rest)?;
        Ok(Self {
            op,
            date,
            raw: expr.to_string(),
        })
    }

    /// Compares `value` against the expression.
    ///
    /// When the expression holds a date without a time, both sides are
    /// compared by calendar day.
    pub fn matches(&self, value: &str) -> Result<bool, ApiError> {
        let other = parse_date(value)?;
        let ordering = if self.date.date_only {
            other.when.date_naive().cmp(&self.date.when.date_naive())
        } else {
            other.when.cmp(&self.date.when)
        };
        Ok(match self.op {
            DateOp::Gt => ordering.is_gt(),
            DateOp::Ge => ordering.is_ge(),
            DateOp::Lt => ordering.is_lt(),
            DateOp::Le => ordering.is_le(),
            DateOp::Eq => ordering.is_eq(),
        })
    }
}

impl fmt::Display for DateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
