//! Column reconciliation.
//!
//! Maps the header names of an arbitrary upload onto canonical flow fields
//! using a static, priority-ordered table of candidate names.

use std::collections::HashMap;
use std::fmt;

/// Canonical field of a flow row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Symbol,
    Underlying,
    Expiry,
    Strike,
    OptionType,
    Side,
    Price,
    Size,
    Premium,
    OpenInterest,
    Iv,
    Delta,
    Timestamp,
}

impl CanonicalField {
    /// Every canonical field, in resolution order.
    pub const ALL: [CanonicalField; 13] = [
        CanonicalField::Symbol,
        CanonicalField::Underlying,
        CanonicalField::Expiry,
        CanonicalField::Strike,
        CanonicalField::OptionType,
        CanonicalField::Side,
        CanonicalField::Price,
        CanonicalField::Size,
        CanonicalField::Premium,
        CanonicalField::OpenInterest,
        CanonicalField::Iv,
        CanonicalField::Delta,
        CanonicalField::Timestamp,
    ];

    /// Accepted header names, highest priority first.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            CanonicalField::Symbol => &["symbol", "ticker", "underlying", "root", "stock"],
            CanonicalField::Underlying => &["underlying", "root", "ticker"],
            CanonicalField::Expiry => {
                &["expiry", "expiration", "exp", "expiration_date", "exp_date"]
            }
            CanonicalField::Strike => &["strike", "strike_price", "strikeprice", "k"],
            CanonicalField::OptionType => &["type", "call_put", "cp", "option_type"],
            CanonicalField::Side => &["side", "bidask", "bid_ask", "aggressor", "at", "tick"],
            CanonicalField::Price => &["price", "trade_price", "fill_price", "avg_price"],
            CanonicalField::Size => &["size", "qty", "quantity", "volume", "contracts"],
            CanonicalField::Premium => &["premium", "notional", "value", "amount"],
            CanonicalField::OpenInterest => &["oi", "open_interest"],
            CanonicalField::Iv => &["iv", "implied_vol", "implied_volatility"],
            CanonicalField::Delta => &["delta"],
            CanonicalField::Timestamp => &["time", "timestamp", "ts", "date_time"],
        }
    }

    /// Canonical field name.
    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::Symbol => "symbol",
            CanonicalField::Underlying => "underlying",
            CanonicalField::Expiry => "expiry",
            CanonicalField::Strike => "strike",
            CanonicalField::OptionType => "option_type",
            CanonicalField::Side => "side",
            CanonicalField::Price => "price",
            CanonicalField::Size => "size",
            CanonicalField::Premium => "premium",
            CanonicalField::OpenInterest => "open_interest",
            CanonicalField::Iv => "iv",
            CanonicalField::Delta => "delta",
            CanonicalField::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Partial mapping from canonical field to column index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: HashMap<CanonicalField, usize>,
}

impl ColumnMapping {
    /// Column index for a field, if mapped.
    pub fn get(&self, field: CanonicalField) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    /// True when the field resolved to a column.
    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.columns.contains_key(&field)
    }

    /// Fields with no matching column.
    pub fn unmapped(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .iter()
            .copied()
            .filter(|f| !self.is_mapped(*f))
            .collect()
    }

    /// Number of mapped fields.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Lower-case and trim a header name.
#[inline]
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Resolve canonical fields against the given header names.
///
/// Headers are matched after [`normalize_header`]. When two headers
/// normalize to the same name the later one wins.
pub fn reconcile<'a, I>(headers: I) -> ColumnMapping
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized: HashMap<String, usize> = headers
        .into_iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header(name), idx))
        .collect();

    let mut columns = HashMap::new();
    for field in CanonicalField::ALL {
        if let Some(&idx) = field
            .candidates()
            .iter()
            .find_map(|cand| normalized.get(*cand))
        {
            columns.insert(field, idx);
        }
    }

    ColumnMapping { columns }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_headers() {
        let mapping = reconcile([
            "symbol", "expiry", "strike", "type", "side", "price", "size", "premium",
        ]);
        assert_eq!(mapping.get(CanonicalField::Symbol), Some(0));
        assert_eq!(mapping.get(CanonicalField::Strike), Some(2));
        assert_eq!(mapping.get(CanonicalField::OptionType), Some(3));
        assert_eq!(mapping.get(CanonicalField::Premium), Some(7));
        assert!(!mapping.is_mapped(CanonicalField::Delta));
        assert!(!mapping.is_mapped(CanonicalField::Underlying));
    }

    #[test]
    fn test_case_and_whitespace_normalized() {
        let mapping = reconcile(["  Ticker ", "STRIKE_PRICE", "Call_Put", "Qty"]);
        assert_eq!(mapping.get(CanonicalField::Symbol), Some(0));
        assert_eq!(mapping.get(CanonicalField::Underlying), Some(0));
        assert_eq!(mapping.get(CanonicalField::Strike), Some(1));
        assert_eq!(mapping.get(CanonicalField::OptionType), Some(2));
        assert_eq!(mapping.get(CanonicalField::Size), Some(3));
    }

    #[test]
    fn test_priority_order() {
        // "strike" outranks "k" regardless of column position
        let mapping = reconcile(["k", "strike"]);
        assert_eq!(mapping.get(CanonicalField::Strike), Some(1));

        // symbol prefers "symbol" over "underlying"; underlying takes its own column
        let mapping = reconcile(["underlying", "symbol"]);
        assert_eq!(mapping.get(CanonicalField::Symbol), Some(1));
        assert_eq!(mapping.get(CanonicalField::Underlying), Some(0));
    }

    #[test]
    fn test_duplicate_header_last_wins() {
        let mapping = reconcile(["Strike", "strike "]);
        assert_eq!(mapping.get(CanonicalField::Strike), Some(1));
    }

    #[test]
    fn test_no_known_headers() {
        let mapping = reconcile(["foo", "bar"]);
        assert!(mapping.is_empty());
        assert_eq!(mapping.unmapped().len(), CanonicalField::ALL.len());
    }
}
