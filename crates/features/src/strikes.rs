//! Premium-by-strike aggregation.
//!
//! Accumulates unsigned premium per strike while remembering the order in
//! which strikes were first seen, so rankings break ties by encounter order.

use flowcast_core::{FlowRow, StrikePremium};
use ordered_float::OrderedFloat;
use std::collections::HashMap;

/// Unsigned premium grouped by strike.
#[derive(Debug, Clone, Default)]
pub struct StrikeAggregator {
    /// Position of each strike in `levels`.
    index: HashMap<OrderedFloat<f64>, usize>,
    /// Aggregated levels in first-encounter order.
    levels: Vec<StrikePremium>,
    /// Sum of all premium added.
    total: f64,
}

impl StrikeAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate every row of a table.
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a FlowRow>) -> Self {
        let mut agg = Self::new();
        for row in rows {
            agg.add_row(row);
        }
        agg
    }

    /// Add premium at a strike.
    pub fn add(&mut self, strike: f64, premium: f64) {
        let key = OrderedFloat(strike);
        match self.index.get(&key) {
            Some(&pos) => self.levels[pos].premium += premium,
            None => {
                self.index.insert(key, self.levels.len());
                self.levels.push(StrikePremium { strike, premium });
            }
        }
        self.total += premium;
    }

    /// Add a row's premium (absent counts as zero).
    pub fn add_row(&mut self, row: &FlowRow) {
        self.add(row.strike, row.premium_or_zero());
    }

    /// Total premium across strikes.
    pub fn total_premium(&self) -> f64 {
        self.total
    }

    /// Number of distinct strikes.
    pub fn strike_count(&self) -> usize {
        self.levels.len()
    }

    /// The `n` largest levels by premium, descending. Equal premiums keep encounter order.
    pub fn top(&self, n: usize) -> Vec<StrikePremium> {
        let mut ranked = self.levels.clone();
        ranked.sort_by(|a, b| {
            b.premium
                .partial_cmp(&a.premium)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(n);
        ranked
    }

    /// Herfindahl index of premium shares; 0.0 when total premium is not positive.
    pub fn hhi(&self) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        self.levels
            .iter()
            .map(|level| {
                let share = level.premium / self.total;
                share * share
            })
            .sum()
    }
}
