use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

use super::record::Record;
use crate::constants::{COST_COLUMN, PRICE_COLUMN, SUGGESTED_MARKUP_PERCENTS};

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.\-]+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedPrice {
    pub percent: u32,
    pub price: f64,
}

/// Margin figures derived from a record's Cost and Price columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginView {
    pub cost: f64,
    pub price: f64,
    pub margin: f64,
    pub margin_percent: f64,
    pub suggested: Vec<SuggestedPrice>,
}

/// Parse a currency string such as "$1,234.50" by dropping everything but
/// digits, dots and minus signs.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned = NON_NUMERIC.replace_all(raw, "");
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl MarginView {
    /// Build the view for `record`. Returns None unless Cost parses to a
    /// positive number. A missing or unreadable Price counts as zero.
    ///
    /// Column names match case-insensitively when no exact match exists.
    pub fn for_record(record: &Record) -> Option<Self> {
        let cost = record
            .get_ignore_case(COST_COLUMN)
            .and_then(parse_currency)
            .filter(|cost| *cost > 0.0)?;
        let price = record
            .get_ignore_case(PRICE_COLUMN)
            .and_then(parse_currency)
            .unwrap_or(0.0);
        let margin = price - cost;

        Some(Self {
            cost,
            price,
            margin,
            margin_percent: margin / cost * 100.0,
            suggested: SUGGESTED_MARKUP_PERCENTS
                .iter()
                .map(|&percent| SuggestedPrice {
                    percent,
                    price: cost * (1.0 + f64::from(percent) / 100.0),
                })
                .collect(),
        })
    }

    pub fn suggested_at(&self, percent: u32) -> Option<f64> {
        self.suggested
            .iter()
            .find(|s| s.percent == percent)
            .map(|s| s.price)
    }
}

impl fmt::Display for MarginView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Margin: ${:.2} ({:.2}%)", self.margin, self.margin_percent)?;
        write!(f, "Suggested Prices:")?;
        for s in &self.suggested {
            write!(f, " {}%: ${:.2}", s.percent, s.price)?;
        }
        Ok(())
    }
}
