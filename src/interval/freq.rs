use std::{fmt, str::FromStr};

use jiff::{civil::Date, Span, ToSpan};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::interval::DateExt;

#[derive(Error, Debug, PartialEq)]
#[error("{0}")]
pub struct ParseError(pub String);

/// Spacing of the dates in an output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freq {
    Daily,
    Monthly,
    #[default]
    Annual,
}

impl Freq {
    /// Length of `n` periods.
    fn span(&self, n: i64) -> Span {
        match self {
            Freq::Daily => n.days(),
            Freq::Monthly => n.months(),
            Freq::Annual => n.years(),
        }
    }

    /// The dates `start + n * period` that are `<= end`.
    ///
    /// Every date is computed from the anchor, not from the previous date, so
    /// an anchor on Jan 31 gives Feb 29 (or 28) and then Mar 31.  Returns an
    /// empty vector if `end < start`.
    pub fn dates(&self, start: Date, end: Date) -> Vec<Date> {
        if let Freq::Daily = self {
            return start.up_to(end);
        }
        let mut out = Vec::new();
        let mut n: i64 = 0;
        loop {
            let current = match start.checked_add(self.span(n)) {
                Ok(d) => d,
                Err(_) => break,
            };
            if current > end {
                break;
            }
            out.push(current);
            n += 1;
        }
        out
    }
}

impl FromStr for Freq {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d" | "day" | "daily" => Ok(Freq::Daily),
            "ms" | "month" | "monthly" => Ok(Freq::Monthly),
            "as" | "ys" | "year" | "yearly" | "annual" => Ok(Freq::Annual),
            _ => Err(ParseError(format!("Failed parsing {} as a frequency", s))),
        }
    }
}

impl fmt::Display for Freq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Freq::Daily => "daily",
            Freq::Monthly => "monthly",
            Freq::Annual => "annual",
        };
        f.write_str(s)
    }
}
