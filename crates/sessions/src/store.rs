use std::time::Duration;

use {
    chrono::{DateTime, Utc},
    dashmap::DashMap,
    onika_common::RequesterId,
    onika_config::SessionsConfig,
    onika_tools::SearchResult,
    tokio::time::Instant,
    tracing::debug,
};

#[cfg(feature = "metrics")]
use onika_metrics::{counter, gauge, labels, sessions as session_metrics};

/// What the assistant remembers about a requester's last artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub last_artifact: String,
    pub last_topic: String,
    /// Where the artifact was stored, if storing succeeded.
    pub last_location: Option<String>,
    /// Search results the artifact was generated with.
    pub last_search: Vec<SearchResult>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(artifact: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            last_artifact: artifact.into(),
            last_topic: topic.into(),
            last_location: None,
            last_search: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Option<String>) -> Self {
        self.last_location = location;
        self
    }

    #[must_use]
    pub fn with_search(mut self, results: Vec<SearchResult>) -> Self {
        self.last_search = results;
        self
    }
}

#[derive(Debug)]
struct Entry {
    record: SessionRecord,
    touched: Instant,
}

/// Sharded map of session records keyed by requester.
///
/// Writers for different requesters land on different shards and don't
/// contend. Entries older than the TTL read as absent; once the cap is hit
/// the least recently written entry is dropped to make room.
#[derive(Debug)]
pub struct SessionStore {
    entries: DashMap<RequesterId, Entry>,
    ttl: Option<Duration>,
    max_entries: usize,
}

impl SessionStore {
    /// `ttl` of `None` disables expiry. `max_entries` is at least 1.
    #[must_use]
    pub fn new(ttl: Option<Duration>, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    #[must_use]
    pub fn from_config(config: &SessionsConfig) -> Self {
        let ttl = (config.ttl_secs > 0).then(|| Duration::from_secs(config.ttl_secs));
        Self::new(ttl, config.max_entries)
    }

    /// Overwrite the record for `requester`.
    pub fn record(&self, requester: &RequesterId, record: SessionRecord) {
        if !self.entries.contains_key(requester) && self.entries.len() >= self.max_entries {
            self.make_room();
        }
        self.entries.insert(requester.clone(), Entry {
            record,
            touched: Instant::now(),
        });

        #[cfg(feature = "metrics")]
        gauge!(session_metrics::ACTIVE).set(self.entries.len() as f64);
    }

    /// The live record for `requester`, if any.
    #[must_use]
    pub fn get(&self, requester: &RequesterId) -> Option<SessionRecord> {
        {
            let entry = self.entries.get(requester)?;
            if !self.is_expired(&entry) {
                return Some(entry.record.clone());
            }
        }
        if self
            .entries
            .remove_if(requester, |_, entry| self.is_expired(entry))
            .is_some()
        {
            debug!(requester = %requester, "session expired");
            return None;
        }
        // Rewritten or cleared between the read and the removal.
        self.entries
            .get(requester)
            .filter(|entry| !self.is_expired(entry))
            .map(|entry| entry.record.clone())
    }

    /// Whether `requester` has a live record.
    #[must_use]
    pub fn contains(&self, requester: &RequesterId) -> bool {
        self.get(requester).is_some()
    }

    /// Forget `requester`.
    pub fn clear(&self, requester: &RequesterId) -> bool {
        self.entries.remove(requester).is_some()
    }

    /// Number of live (unexpired) records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| !self.is_expired(entry.value()))
            .count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired record. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !self.is_expired(entry));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "pruned expired sessions");
            #[cfg(feature = "metrics")]
            counter!(session_metrics::EVICTED_TOTAL, labels::REASON => "ttl")
                .increment(removed as u64);
        }
        removed
    }

    fn is_expired(&self, entry: &Entry) -> bool {
        self.ttl
            .is_some_and(|ttl| entry.touched.elapsed() >= ttl)
    }

    fn make_room(&self) {
        if self.prune_expired() > 0 && self.entries.len() < self.max_entries {
            return;
        }
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().touched)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            debug!(requester = %key, "evicted oldest session at capacity");
            #[cfg(feature = "metrics")]
            counter!(session_metrics::EVICTED_TOTAL, labels::REASON => "capacity").increment(1);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::from_config(&SessionsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(id: i64) -> RequesterId {
        RequesterId::from(id)
    }

    #[test]
    fn absent_until_recorded() {
        let store = SessionStore::default();
        assert!(store.get(&rid(1)).is_none());

        store.record(&rid(1), SessionRecord::new("text", "topic"));
        let record = store.get(&rid(1));
        assert_eq!(record.map(|r| r.last_artifact), Some("text".to_string()));
    }

    #[test]
    fn record_overwrites() {
        let store = SessionStore::default();
        store.record(&rid(1), SessionRecord::new("first", "a"));
        store.record(
            &rid(1),
            SessionRecord::new("second", "b").with_location(Some("/tmp/x.md".into())),
        );

        let Some(record) = store.get(&rid(1)) else {
            panic!("record missing");
        };
        assert_eq!(record.last_artifact, "second");
        assert_eq!(record.last_topic, "b");
        assert_eq!(record.last_location.as_deref(), Some("/tmp/x.md"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn requesters_are_isolated() {
        let store = SessionStore::default();
        store.record(&rid(1), SessionRecord::new("one", "t"));
        store.record(&rid(2), SessionRecord::new("two", "t"));
        assert_eq!(
            store.get(&rid(1)).map(|r| r.last_artifact),
            Some("one".to_string())
        );
        assert!(store.clear(&rid(2)));
        assert!(!store.contains(&rid(2)));
        assert!(store.contains(&rid(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let store = SessionStore::new(Some(Duration::from_secs(60)), 10);
        store.record(&rid(1), SessionRecord::new("text", "t"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(store.contains(&rid(1)));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(store.get(&rid(1)).is_none());
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_read_drops_the_entry() {
        let store = SessionStore::new(Some(Duration::from_secs(60)), 10);
        store.record(&rid(1), SessionRecord::new("text", "t"));
        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(store.get(&rid(1)).is_none());
        assert!(store.entries.is_empty());
        assert!(store.get(&rid(1)).is_none());
        assert!(!store.clear(&rid(1)));

        store.record(&rid(1), SessionRecord::new("fresh", "t"));
        assert_eq!(
            store.get(&rid(1)).map(|r| r.last_artifact),
            Some("fresh".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_ttl_never_expires() {
        let store = SessionStore::new(None, 10);
        store.record(&rid(1), SessionRecord::new("text", "t"));
        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert!(store.contains(&rid(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_evicts_oldest() {
        let store = SessionStore::new(None, 2);
        store.record(&rid(1), SessionRecord::new("a", "t"));
        tokio::time::advance(Duration::from_secs(1)).await;
        store.record(&rid(2), SessionRecord::new("b", "t"));
        tokio::time::advance(Duration::from_secs(1)).await;
        store.record(&rid(3), SessionRecord::new("c", "t"));

        assert!(!store.contains(&rid(1)));
        assert!(store.contains(&rid(2)));
        assert!(store.contains(&rid(3)));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rewriting_existing_entry_does_not_evict() {
        let store = SessionStore::new(None, 2);
        store.record(&rid(1), SessionRecord::new("a", "t"));
        store.record(&rid(2), SessionRecord::new("b", "t"));
        store.record(&rid(1), SessionRecord::new("a2", "t"));
        assert!(store.contains(&rid(1)));
        assert!(store.contains(&rid(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_prefers_expired_entries() {
        let store = SessionStore::new(Some(Duration::from_secs(10)), 2);
        store.record(&rid(1), SessionRecord::new("a", "t"));
        tokio::time::advance(Duration::from_secs(8)).await;
        store.record(&rid(2), SessionRecord::new("b", "t"));
        tokio::time::advance(Duration::from_secs(3)).await;
        store.record(&rid(3), SessionRecord::new("c", "t"));

        assert!(store.contains(&rid(2)));
        assert!(store.contains(&rid(3)));
        assert_eq!(store.prune_expired(), 0);
    }

    #[test]
    fn from_config_zero_ttl_disables_expiry() {
        let store = SessionStore::from_config(&SessionsConfig {
            ttl_secs: 0,
            max_entries: 5,
        });
        assert!(store.ttl.is_none());
        assert_eq!(store.max_entries, 5);
    }
}
