//! Call history lookup: the pull-based number source.
//!
//! Queried only when live capture produced no number. Each query is bounded
//! by a timeout so a slow content provider cannot stall resolution.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use redial_core::{CallHistory, DialedNumber, HistoryRecord, NumberPlan};

/// Normalizing, time-bounded view over a `CallHistory`.
#[derive(Clone)]
pub struct CallHistoryLookup {
    history: Arc<dyn CallHistory>,
    plan: NumberPlan,
    timeout: Duration,
}

impl CallHistoryLookup {
    pub fn new(history: Arc<dyn CallHistory>, plan: NumberPlan, timeout: Duration) -> Self {
        Self {
            history,
            plan,
            timeout,
        }
    }

    /// Canonical number of the latest outgoing call within `window`.
    pub async fn lookup(&self, window: Duration) -> Option<DialedNumber> {
        let name = self.history.name();
        let query = self.history.lookup_last_outgoing(window);
        match tokio::time::timeout(self.timeout, query).await {
            Ok(Ok(Some(record))) => {
                let number = DialedNumber::parse(&record.number, &self.plan);
                if number.is_none() {
                    debug!(history = name, "History record has no digits");
                }
                number
            }
            Ok(Ok(None)) => {
                debug!(history = name, window_ms = window.as_millis() as u64, "No outgoing record in window");
                None
            }
            Ok(Err(e)) => {
                warn!(history = name, error = %e, "Call history query failed");
                None
            }
            Err(_) => {
                warn!(
                    history = name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Call history query timed out"
                );
                None
            }
        }
    }
}

/// Direction of a logged call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    Outgoing,
    Incoming,
    Missed,
}

/// Bounded in-process call log.
pub struct InMemoryCallLog {
    capacity: usize,
    records: Mutex<VecDeque<(CallDirection, HistoryRecord)>>,
}

impl InMemoryCallLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn record(&self, direction: CallDirection, number: impl Into<String>, placed_at: DateTime<Utc>) {
        let mut records = self.records.lock().await;
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back((
            direction,
            HistoryRecord {
                number: number.into(),
                placed_at,
            },
        ));
    }

    pub async fn record_outgoing(&self, number: impl Into<String>, placed_at: DateTime<Utc>) {
        self.record(CallDirection::Outgoing, number, placed_at).await;
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

impl Default for InMemoryCallLog {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl CallHistory for InMemoryCallLog {
    fn name(&self) -> &str {
        "in_memory_call_log"
    }

    async fn lookup_last_outgoing(&self, window: Duration) -> Result<Option<HistoryRecord>> {
        let window = chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::zero());
        let since = Utc::now() - window;
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|(direction, record)| *direction == CallDirection::Outgoing && record.placed_at >= since)
            .map(|(_, record)| record)
            .max_by_key(|record| record.placed_at)
            .cloned())
    }
}
