/// Running peak and worst peak-to-trough decline of an equity series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownTracker {
    peak: f64,
    max_drawdown: f64,
}

impl DrawdownTracker {
    pub fn new(starting_equity: f64) -> Self {
        Self {
            peak: starting_equity,
            max_drawdown: 0.0,
        }
    }

    /// Record one equity sample and return its drawdown from the running peak.
    ///
    /// A non-positive peak yields a drawdown of 0.
    pub fn observe(&mut self, equity: f64) -> f64 {
        if equity > self.peak {
            self.peak = equity;
        }
        let drawdown = if self.peak > 0.0 && equity < self.peak {
            (self.peak - equity) / self.peak
        } else {
            0.0
        };
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
        drawdown
    }

    pub fn max_drawdown(&self) -> f64 {
        self.max_drawdown
    }
}

/// Maximum drawdown of a complete equity curve, peak seeded from its first value.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut tracker = DrawdownTracker::new(first);
    for &value in equity_curve {
        tracker.observe(value);
    }
    tracker.max_drawdown()
}
