//! Technical indicators backing the Momentum and Mean-Reversion built-in strategies.

use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Simple moving average over a fixed trailing window.
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<Decimal>,
    sum: Decimal,
}

impl SimpleMovingAverage {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "period must be positive");
        Self { period, values: VecDeque::new(), sum: Decimal::ZERO }
    }

    /// Feeds one new value and returns the current average.
    pub fn update(&mut self, value: Decimal) -> Decimal {
        self.values.push_back(value);
        self.sum += value;
        if self.values.len() > self.period {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.average()
    }

    pub fn average(&self) -> Decimal {
        if self.values.is_empty() {
            Decimal::ZERO
        } else {
            self.sum / Decimal::from(self.values.len() as u64)
        }
    }

    /// Whether the window has filled at least once, i.e. the average reflects `period` samples.
    pub fn is_ready(&self) -> bool {
        self.values.len() >= self.period
    }
}

/// Exponential moving average; seeds at the first observed value.
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    multiplier: Decimal,
    value: Option<Decimal>,
}

impl ExponentialMovingAverage {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "period must be positive");
        let multiplier = Decimal::from(2u64) / Decimal::from(period as u64 + 1);
        Self { multiplier, value: None }
    }

    pub fn update(&mut self, price: Decimal) -> Decimal {
        match self.value {
            Some(val) => {
                let next = (price - val) * self.multiplier + val;
                self.value = Some(next);
                next
            }
            None => {
                self.value = Some(price);
                price
            }
        }
    }

    pub fn value(&self) -> Option<Decimal> {
        self.value
    }
}

/// A rolling z-score over a fixed trailing window, backing the Mean-Reversion strategy's entry
/// and exit signals.
#[derive(Debug, Clone)]
pub struct RollingZScore {
    period: usize,
    values: VecDeque<Decimal>,
    sum: Decimal,
    sum_sq: Decimal,
}

impl RollingZScore {
    pub fn new(period: usize) -> Self {
        assert!(period >= 2, "z-score window needs at least 2 samples");
        Self { period, values: VecDeque::new(), sum: Decimal::ZERO, sum_sq: Decimal::ZERO }
    }

    pub fn is_ready(&self) -> bool {
        self.values.len() >= self.period
    }

    /// Feeds one new value and returns the z-score of `value` against the trailing window
    /// (including `value` itself), or `None` until the window has filled.
    pub fn update(&mut self, value: Decimal) -> Option<Decimal> {
        self.values.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;
        if self.values.len() > self.period {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }

        if !self.is_ready() {
            return None;
        }

        let n = Decimal::from(self.values.len() as u64);
        let mean = self.sum / n;
        let variance = (self.sum_sq / n) - (mean * mean);
        if variance.is_sign_negative() || variance.is_zero() {
            return Some(Decimal::ZERO);
        }
        let std_dev = variance.sqrt()?;
        Some((value - mean) / std_dev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn sma_averages_the_trailing_window() {
        let mut sma = SimpleMovingAverage::new(3);
        sma.update(dec!(10));
        sma.update(dec!(20));
        assert_eq!(sma.update(dec!(30)), dec!(20));
        assert!(sma.is_ready());
        assert_eq!(sma.update(dec!(60)), dec!(36.666666666666666666666666667));
    }

    #[test]
    fn ema_seeds_at_the_first_value() {
        let mut ema = ExponentialMovingAverage::new(2);
        assert_eq!(ema.update(dec!(10)), dec!(10));
        assert!(ema.update(dec!(20)) > dec!(10));
    }

    #[test]
    fn z_score_is_zero_for_a_flat_series() {
        let mut z = RollingZScore::new(3);
        z.update(dec!(5));
        z.update(dec!(5));
        assert_eq!(z.update(dec!(5)), Some(Decimal::ZERO));
    }

    #[test]
    fn z_score_is_none_before_the_window_fills() {
        let mut z = RollingZScore::new(5);
        assert_eq!(z.update(dec!(1)), None);
        assert_eq!(z.update(dec!(2)), None);
    }

    #[test]
    fn z_score_is_positive_above_the_rolling_mean() {
        let mut z = RollingZScore::new(3);
        z.update(dec!(10));
        z.update(dec!(10));
        let score = z.update(dec!(20)).unwrap();
        assert!(score > Decimal::ZERO);
    }
}
