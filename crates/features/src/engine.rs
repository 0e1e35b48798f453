//! Feature computation engine.
//!
//! Derives the fixed feature vector from a canonical flow table. Every
//! computation is order-independent and side-effect free; an empty table is
//! valid input.

use crate::strikes::StrikeAggregator;
use flowcast_core::config::FeatureConfig;
use flowcast_core::{EngineeredFeatures, FlowRow, FlowTable, OptionType, Side};
use statrs::statistics::Statistics;
use tracing::debug;

/// Per-table premium accumulator.
#[derive(Debug, Clone, Default)]
struct PremiumAccumulator {
    net_call: f64,
    net_put: f64,
    call_premium: f64,
    put_premium: f64,
    ask_premium: f64,
    bid_premium: f64,
    delta_notional: f64,
    delta_rows: u32,
    call_ivs: Vec<f64>,
    put_ivs: Vec<f64>,
}

impl PremiumAccumulator {
    fn add(&mut self, row: &FlowRow) {
        let premium = row.premium_or_zero();

        match row.option_type {
            OptionType::Call => {
                self.net_call += row.signed_premium();
                self.call_premium += premium;
            }
            OptionType::Put => {
                self.net_put += row.signed_premium();
                self.put_premium += premium;
            }
        }

        match row.side {
            Side::Ask => self.ask_premium += premium,
            Side::Bid => self.bid_premium += premium,
            Side::Mid | Side::Unknown => {}
        }

        if let (Some(delta), Some(premium)) = (row.delta, row.premium) {
            self.delta_notional += delta * premium;
            self.delta_rows += 1;
        }

        if let Some(iv) = row.iv {
            match row.option_type {
                OptionType::Call => self.call_ivs.push(iv),
                OptionType::Put => self.put_ivs.push(iv),
            }
        }
    }

    fn call_put_ratio(&self) -> f64 {
        if self.put_premium != 0.0 {
            self.call_premium / self.put_premium
        } else {
            0.0
        }
    }

    fn aggressiveness(&self, epsilon: f64) -> f64 {
        (self.ask_premium - self.bid_premium) / (self.ask_premium + self.bid_premium).max(epsilon)
    }

    fn delta_notional(&self) -> Option<f64> {
        (self.delta_rows > 0).then_some(self.delta_notional)
    }

    fn skew_proxy(&self) -> Option<f64> {
        if self.call_ivs.is_empty() || self.put_ivs.is_empty() {
            return None;
        }
        Some(self.put_ivs.iter().mean() - self.call_ivs.iter().mean())
    }
}

/// Feature computation engine.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngine {
    config: FeatureConfig,
}

impl FeatureEngine {
    /// Create a new feature engine from configuration.
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Compute engineered features for a table.
    pub fn compute(&self, table: &FlowTable) -> EngineeredFeatures {
        let mut acc = PremiumAccumulator::default();
        let mut strikes = StrikeAggregator::new();

        for row in &table.rows {
            acc.add(row);
            strikes.add_row(row);
        }

        let features = EngineeredFeatures {
            net_call_premium: acc.net_call,
            net_put_premium: acc.net_put,
            call_put_ratio: acc.call_put_ratio(),
            aggressiveness: acc.aggressiveness(self.config.aggressiveness_epsilon),
            top_strikes_by_premium: strikes.top(self.config.top_strikes),
            concentration_hhi: strikes.hhi(),
            delta_notional: acc.delta_notional(),
            skew_proxy: acc.skew_proxy(),
        };

        debug!(
            rows = table.len(),
            strikes = strikes.strike_count(),
            total_premium = strikes.total_premium(),
            net_call = features.net_call_premium,
            net_put = features.net_put_premium,
            hhi = features.concentration_hhi,
            "Computed flow features"
        );

        features
    }
}

/// Compute features with the default configuration.
pub fn compute_features(table: &FlowTable) -> EngineeredFeatures {
    FeatureEngine::default().compute(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use flowcast_ingestion::parse_csv_bytes;

    fn row(strike: f64, option_type: OptionType, side: Side, premium: f64) -> FlowRow {
        FlowRow::new("SPX", strike, option_type)
            .with_side(side)
            .with_premium(premium)
    }

    fn table(rows: Vec<FlowRow>) -> FlowTable {
        FlowTable::new(rows, None)
    }

    #[test]
    fn test_features_net_premium() {
        let flow = table(vec![
            row(6900.0, OptionType::Call, Side::Ask, 1000.0),
            row(6900.0, OptionType::Put, Side::Bid, 500.0),
        ]);
        let feats = compute_features(&flow);
        assert_eq!(feats.net_call_premium, 1000.0);
        assert_eq!(feats.net_put_premium, -500.0);
        assert_relative_eq!(feats.call_put_ratio, 2.0);
        assert_relative_eq!(feats.aggressiveness, 500.0 / 1500.0, epsilon = 1e-12);
        assert_relative_eq!(feats.concentration_hhi, 1.0);
    }

    #[test]
    fn test_empty_table() {
        let feats = compute_features(&FlowTable::default());
        assert_eq!(feats.net_call_premium, 0.0);
        assert_eq!(feats.net_put_premium, 0.0);
        assert_eq!(feats.call_put_ratio, 0.0);
        assert_eq!(feats.aggressiveness, 0.0);
        assert!(feats.top_strikes_by_premium.is_empty());
        assert_eq!(feats.concentration_hhi, 0.0);
        assert!(feats.delta_notional.is_none());
        assert!(feats.skew_proxy.is_none());
    }

    #[test]
    fn test_only_calls() {
        let flow = table(vec![
            row(100.0, OptionType::Call, Side::Ask, 300.0),
            row(105.0, OptionType::Call, Side::Bid, 100.0),
        ]);
        let feats = compute_features(&flow);
        assert_eq!(feats.net_call_premium, 200.0);
        assert_eq!(feats.net_put_premium, 0.0);
        assert_eq!(feats.call_put_ratio, 0.0);
        assert_relative_eq!(feats.aggressiveness, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_only_puts() {
        let flow = table(vec![
            row(100.0, OptionType::Put, Side::Bid, 400.0),
            row(95.0, OptionType::Put, Side::Bid, 100.0),
        ]);
        let feats = compute_features(&flow);
        assert_eq!(feats.net_call_premium, 0.0);
        assert_eq!(feats.net_put_premium, -500.0);
        assert_eq!(feats.call_put_ratio, 0.0);
        assert_relative_eq!(feats.aggressiveness, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ratio_zero_when_put_premium_absent() {
        let puts_without_premium = FlowRow::new("SPX", 95.0, OptionType::Put).with_side(Side::Bid);
        let flow = table(vec![
            row(100.0, OptionType::Call, Side::Ask, 300.0),
            puts_without_premium,
            row(90.0, OptionType::Put, Side::Ask, 0.0),
        ]);
        let feats = compute_features(&flow);
        assert_eq!(feats.call_put_ratio, 0.0);
    }

    #[test]
    fn test_mid_and_unknown_sides() {
        let flow = table(vec![
            row(100.0, OptionType::Call, Side::Mid, 300.0),
            row(100.0, OptionType::Put, Side::Unknown, 200.0),
        ]);
        let feats = compute_features(&flow);
        assert_eq!(feats.net_call_premium, 0.0);
        assert_eq!(feats.net_put_premium, 0.0);
        assert_eq!(feats.aggressiveness, 0.0);
        // unsigned aggregates still see the premium
        assert_relative_eq!(feats.call_put_ratio, 1.5);
        assert_eq!(feats.top_strikes_by_premium[0].premium, 500.0);
    }

    #[test]
    fn test_top_strikes_capped_and_sorted() {
        let rows = (0..12)
            .map(|i| row(100.0 + i as f64, OptionType::Call, Side::Ask, (i + 1) as f64 * 10.0))
            .collect();
        let feats = compute_features(&table(rows));
        let top = &feats.top_strikes_by_premium;
        assert_eq!(top.len(), 8);
        assert_eq!(top[0].strike, 111.0);
        assert!(top.windows(2).all(|w| w[0].premium > w[1].premium));

        let few = table(vec![
            row(100.0, OptionType::Call, Side::Ask, 10.0),
            row(101.0, OptionType::Put, Side::Ask, 20.0),
        ]);
        assert_eq!(compute_features(&few).top_strikes_by_premium.len(), 2);
    }

    #[test]
    fn test_hhi_bounds() {
        let flow = table(vec![
            row(100.0, OptionType::Call, Side::Ask, 100.0),
            row(105.0, OptionType::Put, Side::Bid, 300.0),
        ]);
        let feats = compute_features(&flow);
        // shares 0.25 and 0.75
        assert_relative_eq!(feats.concentration_hhi, 0.625, epsilon = 1e-12);
        assert!((0.0..=1.0).contains(&feats.concentration_hhi));

        let zero = table(vec![row(100.0, OptionType::Call, Side::Ask, 0.0)]);
        assert_eq!(compute_features(&zero).concentration_hhi, 0.0);
    }

    #[test]
    fn test_delta_notional_presence() {
        let mut with_delta = row(100.0, OptionType::Call, Side::Ask, 1000.0);
        with_delta.delta = Some(0.5);
        let mut delta_no_premium = FlowRow::new("SPX", 100.0, OptionType::Put);
        delta_no_premium.delta = Some(-0.4);

        let feats = compute_features(&table(vec![with_delta.clone(), delta_no_premium.clone()]));
        assert_relative_eq!(feats.delta_notional.unwrap(), 500.0);

        let feats = compute_features(&table(vec![delta_no_premium]));
        assert!(feats.delta_notional.is_none());

        // zero notional is distinct from no delta data
        let mut zero_delta = row(100.0, OptionType::Call, Side::Ask, 1000.0);
        zero_delta.delta = Some(0.0);
        assert_eq!(compute_features(&table(vec![zero_delta])).delta_notional, Some(0.0));
    }

    #[test]
    fn test_skew_proxy() {
        let mut c1 = row(100.0, OptionType::Call, Side::Ask, 10.0);
        c1.iv = Some(0.20);
        let mut c2 = row(105.0, OptionType::Call, Side::Ask, 10.0);
        c2.iv = Some(0.30);
        let mut p1 = row(95.0, OptionType::Put, Side::Bid, 10.0);
        p1.iv = Some(0.40);

        let feats = compute_features(&table(vec![c1.clone(), c2, p1]));
        assert_relative_eq!(feats.skew_proxy.unwrap(), 0.15, epsilon = 1e-12);

        let feats = compute_features(&table(vec![c1]));
        assert!(feats.skew_proxy.is_none());
    }

    #[test]
    fn test_no_delta_or_iv_columns() {
        let csv = "symbol,strike,type,side,premium\nSPY,500,C,ASK,100\nSPY,495,P,BID,50\n";
        let flow = parse_csv_bytes(csv.as_bytes(), None).unwrap();
        let feats = compute_features(&flow);
        assert!(feats.delta_notional.is_none());
        assert!(feats.skew_proxy.is_none());
    }

    #[test]
    fn test_order_independent_and_idempotent() {
        let rows = vec![
            row(100.0, OptionType::Call, Side::Ask, 100.0),
            row(105.0, OptionType::Put, Side::Bid, 300.0),
            row(110.0, OptionType::Call, Side::Mid, 200.0),
        ];
        let forward = table(rows.clone());
        let mut reversed_rows = rows;
        reversed_rows.reverse();
        let reversed = table(reversed_rows);

        let a = compute_features(&forward);
        let b = compute_features(&reversed);
        assert_eq!(a, compute_features(&forward));
        assert_relative_eq!(a.net_call_premium, b.net_call_premium);
        assert_relative_eq!(a.concentration_hhi, b.concentration_hhi, epsilon = 1e-12);
        assert_eq!(a.top_strikes_by_premium, b.top_strikes_by_premium);
    }

    #[test]
    fn test_custom_top_strikes() {
        let engine = FeatureEngine::new(&FeatureConfig {
            top_strikes: 1,
            ..FeatureConfig::default()
        });
        let flow = table(vec![
            row(100.0, OptionType::Call, Side::Ask, 100.0),
            row(105.0, OptionType::Put, Side::Bid, 300.0),
        ]);
        let feats = engine.compute(&flow);
        assert_eq!(feats.top_strikes_by_premium.len(), 1);
        assert_eq!(feats.top_strikes_by_premium[0].strike, 105.0);
    }
}
