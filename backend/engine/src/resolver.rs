//! Number resolution: the live number first, then call history over
//! widening windows.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use redial_core::DialedNumber;
use redial_sources::CallHistoryLookup;

/// Where a resolved number came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "from", rename_all = "snake_case")]
pub enum Resolution {
    Live,
    History { window_ms: u64 },
}

#[derive(Clone)]
pub struct NumberResolver {
    history: Option<CallHistoryLookup>,
    windows: Vec<Duration>,
}

impl NumberResolver {
    pub fn new(history: Option<CallHistoryLookup>, windows: Vec<Duration>) -> Self {
        Self { history, windows }
    }

    /// Resolve the number to redirect to. `live` always wins.
    pub async fn resolve(&self, live: Option<DialedNumber>) -> Option<(DialedNumber, Resolution)> {
        if let Some(number) = live {
            return Some((number, Resolution::Live));
        }

        let Some(history) = &self.history else {
            debug!("No live number and no call history configured");
            return None;
        };

        for window in &self.windows {
            if let Some(number) = history.lookup(*window).await {
                let window_ms = window.as_millis() as u64;
                info!(window_ms, "Number resolved from call history");
                return Some((number, Resolution::History { window_ms }));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use redial_core::{CallHistory, HistoryRecord, NumberPlan};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Answers only for windows at least `min_window` long; records queries.
    struct WindowedHistory {
        min_window: Duration,
        number: &'static str,
        queried: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl CallHistory for WindowedHistory {
        fn name(&self) -> &str {
            "windowed"
        }
        async fn lookup_last_outgoing(&self, window: Duration) -> anyhow::Result<Option<HistoryRecord>> {
            self.queried.lock().await.push(window);
            Ok((window >= self.min_window).then(|| HistoryRecord {
                number: self.number.to_string(),
                placed_at: Utc::now(),
            }))
        }
    }

    fn resolver(history: Arc<WindowedHistory>) -> NumberResolver {
        let lookup = CallHistoryLookup::new(history, NumberPlan::default(), Duration::from_secs(1));
        NumberResolver::new(
            Some(lookup),
            vec![Duration::from_secs(3), Duration::from_secs(20)],
        )
    }

    fn history(min_window: u64) -> Arc<WindowedHistory> {
        Arc::new(WindowedHistory {
            min_window: Duration::from_secs(min_window),
            number: "89160000002",
            queried: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn live_number_beats_history() {
        let h = history(0);
        let live = DialedNumber::parse("89160000001", &NumberPlan::default());
        let (number, from) = resolver(h.clone()).resolve(live).await.unwrap();
        assert_eq!(number.as_str(), "79160000001");
        assert_eq!(from, Resolution::Live);
        assert!(h.queried.lock().await.is_empty());
    }

    #[tokio::test]
    async fn widens_window_until_found() {
        let h = history(20);
        let (number, from) = resolver(h.clone()).resolve(None).await.unwrap();
        assert_eq!(number.as_str(), "79160000002");
        assert_eq!(from, Resolution::History { window_ms: 20_000 });
        assert_eq!(
            *h.queried.lock().await,
            vec![Duration::from_secs(3), Duration::from_secs(20)]
        );
    }

    #[tokio::test]
    async fn nothing_found() {
        let h = history(60);
        assert!(resolver(h).resolve(None).await.is_none());
        assert!(NumberResolver::new(None, vec![]).resolve(None).await.is_none());
    }
}
