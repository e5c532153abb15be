use std::time::{Duration, Instant};

use super::FeatureError;
use crate::rolling_window::RollingWindow;

pub const DEFAULT_SPAN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Sample {
    price: f64,
    qty: f64,
}

/// Output of [`Vwap::calc`]. All fields are zero when no usable sample exists.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VwapStats {
    pub vwap: f64,
    pub std_dev: f64,
    pub samples: usize,
}

/// Volume-weighted average price over the last `capacity` trades,
/// further restricted to trades younger than `span`.
#[derive(Debug)]
pub struct Vwap {
    window: RollingWindow<Sample>,
    span: Duration,
}

impl Vwap {
    /// A zero `span` falls back to [`DEFAULT_SPAN`].
    pub fn new(capacity: usize, span: Duration) -> Self {
        let span = if span.is_zero() { DEFAULT_SPAN } else { span };
        Self {
            window: RollingWindow::new(capacity),
            span,
        }
    }

    pub fn add(&mut self, price: f64, qty: f64) -> Result<(), FeatureError> {
        self.add_at(Instant::now(), price, qty)
    }

    /// Rejects non-finite or negative inputs without recording anything.
    pub fn add_at(&mut self, at: Instant, price: f64, qty: f64) -> Result<(), FeatureError> {
        validate_sample(price, qty)?;
        self.window.push_at(at, Sample { price, qty });
        Ok(())
    }

    pub fn calc(&self) -> VwapStats {
        self.calc_at(Instant::now())
    }

    pub fn calc_at(&self, now: Instant) -> VwapStats {
        let samples: Vec<Sample> = match now.checked_sub(self.span) {
            Some(cutoff) => self.window.newer_than(cutoff).copied().collect(),
            None => self.window.iter().copied().collect(),
        };

        let (pv, vol) = samples
            .iter()
            .fold((0.0, 0.0), |(pv, vol), s| (pv + s.price * s.qty, vol + s.qty));
        if samples.is_empty() || vol == 0.0 {
            return VwapStats::default();
        }

        let vwap = pv / vol;
        if !vwap.is_finite() {
            return VwapStats::default();
        }
        if samples.len() == 1 {
            return VwapStats {
                vwap,
                std_dev: 0.0,
                samples: 1,
            };
        }

        let variance = samples
            .iter()
            .map(|s| s.qty * (s.price - vwap).powi(2))
            .sum::<f64>()
            / vol;
        let std_dev = if variance > 0.0 { variance.sqrt() } else { 0.0 };

        VwapStats {
            vwap,
            std_dev: if std_dev.is_finite() { std_dev } else { 0.0 },
            samples: samples.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }
}

pub(crate) fn validate_sample(price: f64, qty: f64) -> Result<(), FeatureError> {
    let ok = price.is_finite() && qty.is_finite() && price >= 0.0 && qty >= 0.0;
    if ok {
        Ok(())
    } else {
        Err(FeatureError::InvalidSample { price, qty })
    }
}
