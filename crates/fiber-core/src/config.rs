//! Tunables for the work loop.

use std::time::Duration;

/// Scheduler configuration passed to [`crate::RenderRoot::with_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// A turn keeps processing units of work while the deadline reports at
    /// least this much time remaining.
    pub yield_threshold: Duration,
    /// Attribute keys starting with this prefix are treated as listeners.
    pub event_prefix: String,
}

impl SchedulerConfig {
    pub fn with_yield_threshold(mut self, threshold: Duration) -> Self {
        self.yield_threshold = threshold;
        self
    }

    pub fn with_event_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.event_prefix = prefix.into();
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            yield_threshold: Duration::from_millis(1),
            event_prefix: "on".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_idle_callback_convention() {
        let config = SchedulerConfig::default();
        assert_eq!(config.yield_threshold, Duration::from_millis(1));
        assert_eq!(config.event_prefix, "on");
    }

    #[test]
    fn builders_override_fields() {
        let config = SchedulerConfig::default()
            .with_yield_threshold(Duration::ZERO)
            .with_event_prefix("handle");
        assert_eq!(config.yield_threshold, Duration::ZERO);
        assert_eq!(config.event_prefix, "handle");
    }
}
