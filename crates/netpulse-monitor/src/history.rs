//! Bounded histories: per-target record rings and the alert log.

use std::collections::VecDeque;

use netpulse_core::Alert;

/// Alert log size that triggers trimming.
pub const ALERT_LOG_CAP: usize = 1000;

/// Alerts kept after trimming.
pub const ALERT_LOG_RETAIN: usize = 500;

/// FIFO of at most `limit` items; pushing past the limit evicts the oldest.
#[derive(Debug, Clone)]
pub struct HistoryRing<T> {
    items: VecDeque<T>,
    limit: usize,
}

impl<T: Clone> HistoryRing<T> {
    /// A limit of zero is treated as one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            items: VecDeque::with_capacity(limit.min(1024)),
            limit,
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
        while self.items.len() > self.limit {
            self.items.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// The newest `n` items, oldest first.
    pub fn recent(&self, n: usize) -> Vec<T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip).cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

/// Alerts in emission order. Grows to [`ALERT_LOG_CAP`], then keeps the
/// newest [`ALERT_LOG_RETAIN`].
#[derive(Debug, Clone, Default)]
pub struct AlertLog {
    entries: Vec<Alert>,
}

impl AlertLog {
    pub fn extend(&mut self, alerts: impl IntoIterator<Item = Alert>) {
        self.entries.extend(alerts);
        if self.entries.len() > ALERT_LOG_CAP {
            let excess = self.entries.len() - ALERT_LOG_RETAIN;
            self.entries.drain(..excess);
            tracing::debug!(retained = self.entries.len(), "Alert log trimmed");
        }
    }

    /// The newest `n` alerts, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Alert> {
        self.entries[self.entries.len().saturating_sub(n)..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
