use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared counters for cross-task session monitoring
#[derive(Clone)]
pub struct SessionMetrics {
    // Chat turn counters
    pub messages_sent: Arc<AtomicU64>,
    pub replies_received: Arc<AtomicU64>,
    pub network_errors: Arc<AtomicU64>,
    pub application_errors: Arc<AtomicU64>,

    // Voice capture counters
    pub recognition_sessions: Arc<AtomicU64>,
    pub final_transcripts: Arc<AtomicU64>,
    pub recognition_errors: Arc<AtomicU64>,

    // Voice output counters
    pub utterances_spoken: Arc<AtomicU64>,
    pub synthesis_errors: Arc<AtomicU64>,

    // Status poll counters
    pub status_polls: Arc<AtomicU64>,
    pub status_poll_failures: Arc<AtomicU64>,

    // Activity indicators
    pub is_speaking: Arc<AtomicBool>,
    pub is_listening: Arc<AtomicBool>,
    pub last_reply_at: Arc<RwLock<Option<Instant>>>,
    pub last_reply_latency_ms: Arc<AtomicU64>,
}

impl Default for SessionMetrics {
    fn default() -> Self {
        Self {
            messages_sent: Arc::new(AtomicU64::new(0)),
            replies_received: Arc::new(AtomicU64::new(0)),
            network_errors: Arc::new(AtomicU64::new(0)),
            application_errors: Arc::new(AtomicU64::new(0)),

            recognition_sessions: Arc::new(AtomicU64::new(0)),
            final_transcripts: Arc::new(AtomicU64::new(0)),
            recognition_errors: Arc::new(AtomicU64::new(0)),

            utterances_spoken: Arc::new(AtomicU64::new(0)),
            synthesis_errors: Arc::new(AtomicU64::new(0)),

            status_polls: Arc::new(AtomicU64::new(0)),
            status_poll_failures: Arc::new(AtomicU64::new(0)),

            is_speaking: Arc::new(AtomicBool::new(false)),
            is_listening: Arc::new(AtomicBool::new(false)),
            last_reply_at: Arc::new(RwLock::new(None)),
            last_reply_latency_ms: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl SessionMetrics {
    pub fn record_reply(&self, latency_ms: u64) {
        self.replies_received.fetch_add(1, Ordering::Relaxed);
        self.last_reply_latency_ms
            .store(latency_ms, Ordering::Relaxed);
        *self.last_reply_at.write() = Some(Instant::now());
    }

    pub fn seconds_since_last_reply(&self) -> Option<u64> {
        self.last_reply_at
            .read()
            .map(|at| at.elapsed().as_secs())
    }

    pub fn set_speaking(&self, speaking: bool) {
        self.is_speaking.store(speaking, Ordering::Relaxed);
    }

    pub fn set_listening(&self, listening: bool) {
        self.is_listening.store(listening, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_reply_updates_counters_and_timestamp() {
        let metrics = SessionMetrics::default();
        assert!(metrics.seconds_since_last_reply().is_none());

        metrics.record_reply(125);
        assert_eq!(metrics.replies_received.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.last_reply_latency_ms.load(Ordering::Relaxed), 125);
        assert!(metrics.seconds_since_last_reply().is_some());
    }

    #[test]
    fn clones_share_the_same_counters() {
        let metrics = SessionMetrics::default();
        let clone = metrics.clone();
        clone.messages_sent.fetch_add(3, Ordering::Relaxed);
        assert_eq!(metrics.messages_sent.load(Ordering::Relaxed), 3);
    }
}
