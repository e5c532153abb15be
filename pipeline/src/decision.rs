use tracing::debug;

/// Inputs handed to the decision subsystem for one depth observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub symbol: String,
    pub price: f64,
    pub vwap: f64,
    pub std_dev: f64,
    pub tick_ratio: f64,
    pub depth_ratio: f64,
    pub bid_vol: f64,
    pub ask_vol: f64,
}

/// Call-out to the decision/execution subsystem.
///
/// Invoked synchronously on the depth consumer, so implementations must
/// not block. Outcomes are the implementation's concern.
pub trait DecisionSink: Send + Sync {
    fn attempt_decision(&self, obs: &Observation);
}

/// Logs every observation at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDecisionSink;

impl DecisionSink for LogDecisionSink {
    fn attempt_decision(&self, obs: &Observation) {
        debug!(
            symbol = %obs.symbol,
            price = obs.price,
            vwap = obs.vwap,
            std_dev = obs.std_dev,
            tick_ratio = obs.tick_ratio,
            depth_ratio = obs.depth_ratio,
            "observation"
        );
    }
}
