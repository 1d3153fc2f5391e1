// Strategies shipped with the engine.
pub mod bollinger;
pub mod btc_trader;
pub mod fibonacci;
pub mod macd;
pub mod rsi;
pub mod simple;
pub mod sma_crossover;

use super::{Strategy, StrategyParams};
use crate::error::EngineError;
use shared::models::StrategyInfo;

pub type Factory = fn(&StrategyParams) -> Result<Box<dyn Strategy>, EngineError>;

/// One tranche bought by the lot-based strategies.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lot {
    pub entry: f64,
    pub size: f64,
    pub target_pct: f64,
}

impl Lot {
    pub fn cost(&self) -> f64 {
        self.entry * self.size
    }

    pub fn target_price(&self) -> f64 {
        self.entry * (1.0 + self.target_pct / 100.0)
    }
}

/// Open lots and committed capital of the lot-based strategies.
///
/// A lot bought on one bar is only booked on the next bar, once the position
/// shows the fill. Rejected buys release their allocation.
#[derive(Debug, Default)]
pub(crate) struct LotBook {
    pub lots: Vec<Lot>,
    pub allocated: f64,
    pending: Option<Lot>,
}

impl LotBook {
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Books or drops the lot bought on the previous bar, given the position now held.
    pub fn settle(&mut self, position: f64) {
        let Some(lot) = self.pending.take() else {
            return;
        };
        let held: f64 = self.lots.iter().map(|l| l.size).sum();
        if position >= held + lot.size / 2.0 {
            self.lots.push(lot);
        } else {
            tracing::debug!(entry = lot.entry, size = lot.size, position, "Lot buy did not fill, releasing allocation");
            self.allocated -= lot.cost();
        }
    }

    pub fn open(&mut self, lot: Lot) {
        self.allocated += lot.cost();
        self.pending = Some(lot);
    }

    pub fn close(&mut self, index: usize) -> Lot {
        let lot = self.lots.remove(index);
        self.allocated -= lot.cost();
        lot
    }
}

pub struct BuiltinStrategy {
    pub info: StrategyInfo,
    pub factory: Factory,
}

/// Registration order is the order shown to users.
pub fn all() -> Vec<BuiltinStrategy> {
    vec![
        BuiltinStrategy { info: sma_crossover::info(), factory: sma_crossover::build },
        BuiltinStrategy { info: rsi::info(), factory: rsi::build },
        BuiltinStrategy { info: macd::info(), factory: macd::build },
        BuiltinStrategy { info: fibonacci::info(), factory: fibonacci::build },
        BuiltinStrategy { info: bollinger::info(), factory: bollinger::build },
        BuiltinStrategy { info: simple::info(), factory: simple::build },
        BuiltinStrategy { info: btc_trader::info(), factory: btc_trader::build },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(size: f64) -> Lot {
        Lot { entry: 100.0, size, target_pct: 0.5 }
    }

    #[test]
    fn test_lot_book_books_filled_buys_only() {
        let mut book = LotBook::default();
        book.open(lot(1.5));
        assert!(book.has_pending());
        assert!((book.allocated - 150.0).abs() < 1e-9);

        book.settle(1.5);
        assert_eq!(book.lots, vec![lot(1.5)]);
        assert!(!book.has_pending());

        book.open(lot(2.0));
        // the broker rejected the second buy: position unchanged
        book.settle(1.5);
        assert_eq!(book.lots.len(), 1);
        assert!((book.allocated - 150.0).abs() < 1e-9);

        let closed = book.close(0);
        assert_eq!(closed.size, 1.5);
        assert!(book.lots.is_empty());
        assert!(book.allocated.abs() < 1e-9);
    }

    #[test]
    fn test_lot_book_settles_against_same_bar_sells() {
        let mut book = LotBook::default();
        book.open(lot(1.0));
        book.settle(1.0);
        book.open(lot(2.0));
        book.settle(3.0);
        // lot 0 sold while a new buy was submitted on the same bar
        book.close(0);
        book.open(lot(1.0));
        book.settle(3.0);
        assert_eq!(book.lots, vec![lot(2.0), lot(1.0)]);
        assert!((book.allocated - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_builtins_build_with_defaults() {
        for builtin in all() {
            let params = StrategyParams::defaults(&builtin.info.params);
            let strategy = (builtin.factory)(&params).unwrap();
            assert_eq!(strategy.name(), builtin.info.name);
            for spec in &builtin.info.params {
                assert!(spec.min <= spec.default && spec.default <= spec.max, "{}::{}", builtin.info.name, spec.name);
            }
        }
    }
}
