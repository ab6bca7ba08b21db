//! Named wall-clock accumulators for phase timing

use crate::error::{Result, SamplerError};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
struct Timer {
    total: Duration,
    started: Option<Instant>,
}

/// Per-category phase timers
///
/// Categories spring into existence on first use. Starting a running timer
/// restarts it; stopping a timer that is not running is a usage error.
#[derive(Debug, Clone, Default)]
pub struct StatsRegistry {
    timers: BTreeMap<String, Timer>,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timing `category`
    pub fn start(&mut self, category: &str) {
        let timer = self.timers.entry(category.to_string()).or_default();
        if timer.started.is_some() {
            log::warn!("Starting timer twice for category {}", category);
        }
        timer.started = Some(Instant::now());
    }

    /// Stop timing `category` and add the elapsed time to its total
    pub fn stop(&mut self, category: &str) -> Result<Duration> {
        let timer = self
            .timers
            .get_mut(category)
            .filter(|timer| timer.started.is_some())
            .ok_or_else(|| SamplerError::TimerNotStarted(category.to_string()))?;

        let elapsed = timer.started.take().map(|t| t.elapsed()).unwrap_or_default();
        timer.total += elapsed;
        Ok(elapsed)
    }

    /// Accumulated time of `category` (zero if it never ran)
    pub fn total(&self, category: &str) -> Duration {
        self.timers
            .get(category)
            .map(|timer| timer.total)
            .unwrap_or_default()
    }

    pub fn is_running(&self, category: &str) -> bool {
        self.timers
            .get(category)
            .is_some_and(|timer| timer.started.is_some())
    }

    /// Categories with their accumulated totals, in name order
    pub fn totals(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.timers
            .iter()
            .map(|(name, timer)| (name.as_str(), timer.total))
    }

    pub fn format_summary(&self) -> String {
        let mut s = String::new();
        for (category, total) in self.totals() {
            s.push_str(&format!("{} time: {:.6}\n", category, total.as_secs_f64()));
        }
        s
    }
}
