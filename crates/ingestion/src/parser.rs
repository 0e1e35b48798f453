//! Table parsing.
//!
//! Turns raw tabular bytes into a canonical [`FlowTable`]. Columns are
//! reconciled once per table; each row is then normalized field by field.
//! Rows without a usable strike or option type are dropped and counted in
//! [`ParseStats`]; only a structurally unreadable table is an error.

use crate::columns::{reconcile, CanonicalField, ColumnMapping};
use crate::normalize::{normalize_option_type, normalize_side, normalize_text, to_float};
use csv::{ReaderBuilder, StringRecord};
use flowcast_core::config::ParserConfig;
use flowcast_core::{Error, FlowRow, FlowTable, Result};
use tracing::{debug, trace};

/// Statistics about row-level filtering during a parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Data rows read from the input.
    pub rows_read: u64,
    /// Rows that entered the table.
    pub rows_kept: u64,
    /// Rows dropped because the strike was missing or unparsable.
    pub dropped_missing_strike: u64,
    /// Rows dropped because the option type was missing or unrecognized.
    pub dropped_missing_option_type: u64,
    /// Rows whose premium was derived from price and size.
    pub premiums_derived: u64,
}

impl ParseStats {
    /// Total rows dropped.
    pub fn rows_dropped(&self) -> u64 {
        self.dropped_missing_strike + self.dropped_missing_option_type
    }

    /// Fraction of read rows that were dropped.
    pub fn drop_frac(&self) -> f64 {
        if self.rows_read > 0 {
            self.rows_dropped() as f64 / self.rows_read as f64
        } else {
            0.0
        }
    }
}

/// A parsed table together with its filtering statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    pub table: FlowTable,
    pub stats: ParseStats,
}

/// Why a row was rejected.
enum Rejection {
    MissingStrike,
    MissingOptionType,
}

/// Parser for tabular flow uploads with a header row.
#[derive(Debug, Clone, Default)]
pub struct TableParser {
    config: ParserConfig,
}

impl TableParser {
    /// Create a new table parser.
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse raw bytes into a flow table.
    pub fn parse(&self, data: &[u8], provider: Option<&str>) -> Result<ParsedTable> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.config.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let headers = reader.headers()?.clone();
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(Error::parse("input has no header row"));
        }

        let mapping = reconcile(headers.iter());
        debug!(
            columns = headers.len(),
            mapped = mapping.len(),
            unmapped = ?mapping.unmapped(),
            "Reconciled flow columns"
        );

        let mut rows = Vec::new();
        let mut stats = ParseStats::default();

        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            if record.len() > headers.len() {
                return Err(Error::parse(format!(
                    "row {} has {} fields, header has {}",
                    idx + 1,
                    record.len(),
                    headers.len()
                )));
            }

            stats.rows_read += 1;
            match self.build_row(&record, &mapping, &mut stats) {
                Ok(row) => {
                    stats.rows_kept += 1;
                    rows.push(row);
                }
                Err(Rejection::MissingStrike) => {
                    stats.dropped_missing_strike += 1;
                    trace!(row = idx + 1, "Dropping row without strike");
                }
                Err(Rejection::MissingOptionType) => {
                    stats.dropped_missing_option_type += 1;
                    trace!(row = idx + 1, "Dropping row without option type");
                }
            }
        }

        debug!(
            rows_read = stats.rows_read,
            rows_kept = stats.rows_kept,
            rows_dropped = stats.rows_dropped(),
            drop_frac = stats.drop_frac(),
            provider = provider.unwrap_or(""),
            "Parsed flow table"
        );

        Ok(ParsedTable {
            table: FlowTable::new(rows, provider.map(str::to_string)),
            stats,
        })
    }

    /// Build one canonical row from a record.
    fn build_row(
        &self,
        record: &StringRecord,
        mapping: &ColumnMapping,
        stats: &mut ParseStats,
    ) -> std::result::Result<FlowRow, Rejection> {
        let cell = |field: CanonicalField| mapping.get(field).and_then(|idx| record.get(idx));
        let number = |field: CanonicalField| cell(field).and_then(to_float);
        let text = |field: CanonicalField| cell(field).and_then(normalize_text);

        let strike = number(CanonicalField::Strike).ok_or(Rejection::MissingStrike)?;
        let option_type = cell(CanonicalField::OptionType)
            .and_then(normalize_option_type)
            .ok_or(Rejection::MissingOptionType)?;

        let symbol = text(CanonicalField::Symbol);
        let underlying = text(CanonicalField::Underlying);

        let price = number(CanonicalField::Price);
        let size = number(CanonicalField::Size);
        let premium = match (number(CanonicalField::Premium), price, size) {
            (Some(premium), _, _) => Some(premium),
            (None, Some(price), Some(size)) => {
                stats.premiums_derived += 1;
                Some(price * size * self.config.contract_multiplier)
            }
            _ => None,
        };

        Ok(FlowRow {
            symbol: symbol.clone().or_else(|| underlying.clone()).unwrap_or_default(),
            underlying: underlying.or(symbol),
            expiry: text(CanonicalField::Expiry),
            strike,
            option_type,
            side: normalize_side(cell(CanonicalField::Side)),
            price,
            size,
            premium,
            open_interest: number(CanonicalField::OpenInterest),
            iv: number(CanonicalField::Iv),
            delta: number(CanonicalField::Delta),
            timestamp: text(CanonicalField::Timestamp),
        })
    }
}

/// Parse CSV bytes with the default configuration.
pub fn parse_csv_bytes(data: &[u8], provider: Option<&str>) -> Result<FlowTable> {
    TableParser::default()
        .parse(data, provider)
        .map(|parsed| parsed.table)
}

/// Accept a table that is already in canonical shape, e.g. from image extraction.
pub fn parse_flow_json(data: &[u8]) -> Result<FlowTable> {
    serde_json::from_slice(data)
        .map_err(|e| Error::parse(format!("invalid canonical flow table: {e}")))
}
