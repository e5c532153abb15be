use crate::rolling_window::RollingWindow;

/// Normalised bid/ask volume difference in `[-1, 1]`; 0 when both sides are empty.
pub fn depth_imbalance(bid_vol: f64, ask_vol: f64) -> f64 {
    let total = bid_vol + ask_vol;
    if total == 0.0 {
        return 0.0;
    }
    (bid_vol - ask_vol) / total
}

/// Direction of a price move: `+1` up, `-1` down, `0` flat.
pub fn tick_sign(prev: f64, next: f64) -> i8 {
    if next > prev {
        1
    } else if next < prev {
        -1
    } else {
        0
    }
}

/// Rolling mean of signed tick directions.
#[derive(Debug)]
pub struct TickImbalance {
    window: RollingWindow<i8>,
}

impl TickImbalance {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: RollingWindow::new(capacity),
        }
    }

    pub fn add(&mut self, sign: i8) {
        self.window.push(sign.signum());
    }

    pub fn ratio(&self) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let sum: i64 = self.window.iter().map(|&s| i64::from(s)).sum();
        sum as f64 / self.window.len() as f64
    }

    pub fn last(&self) -> Option<i8> {
        self.window.latest().copied()
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
