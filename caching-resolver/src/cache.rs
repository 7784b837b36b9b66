use dns::Message;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

/// An answer as it came back from the forwarder, and when it was stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub message: Message,
    pub cached_at: SystemTime,
}

impl CacheEntry {
    /// Time since the entry was stored. A clock that went backwards counts
    /// as zero.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.cached_at).unwrap_or(Duration::ZERO)
    }
}

/// Answers keyed by question name, exactly as received.
///
/// Entries are only ever overwritten; staleness is decided when reading.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseCache {
    h_map: HashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            h_map: HashMap::new(),
        }
    }

    pub fn lookup(&self, name: &str, now: SystemTime) -> Option<(&Message, Duration)> {
        self.h_map
            .get(name)
            .map(|entry| (&entry.message, entry.age(now)))
    }

    pub fn store(&mut self, name: &str, message: Message, now: SystemTime) {
        let entry = CacheEntry {
            message,
            cached_at: now,
        };
        self.h_map.insert(name.to_string(), entry);
    }

    /// Returns the message for `name` only while it is younger than `ttl`.
    pub fn fresh(&self, name: &str, ttl: Duration, now: SystemTime) -> Option<&Message> {
        match self.lookup(name, now) {
            Some((message, age)) if is_fresh(age, ttl) => Some(message),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.h_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.h_map.is_empty()
    }
}

// Compared in whole seconds: an entry is still fresh during its last second.
fn is_fresh(age: Duration, ttl: Duration) -> bool {
    age.as_secs() <= ttl.as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dns::Question;

    fn answer(id: u16) -> Message {
        Message::query(id, 0x8180, Question::a_record("example.com"))
    }

    #[test]
    fn test_freshness() {
        let ttl = Duration::from_secs(5);
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);

        let mut c = ResponseCache::new();
        c.store("example.com", answer(1), t0);

        let (_, age) = c.lookup("example.com", t0 + Duration::from_secs(4)).unwrap();
        assert!(is_fresh(age, ttl));
        let (_, age) = c.lookup("example.com", t0 + Duration::from_secs(6)).unwrap();
        assert!(!is_fresh(age, ttl));

        assert!(c.fresh("example.com", ttl, t0 + Duration::from_secs(5)).is_some());
        assert!(c.fresh("example.com", ttl, t0 + Duration::from_secs(6)).is_none());
    }

    #[test]
    fn test_store_overwrites() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let t1 = t0 + Duration::from_secs(100);

        let mut c = ResponseCache::new();
        c.store("example.com", answer(1), t0);
        c.store("example.com", answer(2), t1);

        assert_eq!(c.len(), 1);
        let (message, age) = c.lookup("example.com", t1).unwrap();
        assert_eq!(message.header().id(), 2);
        assert_eq!(age, Duration::ZERO);
    }

    #[test]
    fn test_keys_are_exact() {
        let t0 = SystemTime::UNIX_EPOCH;

        let mut c = ResponseCache::new();
        c.store("example.com", answer(1), t0);

        assert!(c.lookup("Example.com", t0).is_none());
        assert!(c.lookup("example.com.", t0).is_none());
        assert!(c.lookup("example.com", t0).is_some());
    }

    #[test]
    fn test_clock_going_backwards() {
        let t0 = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);

        let mut c = ResponseCache::new();
        c.store("example.com", answer(1), t0);

        let (_, age) = c.lookup("example.com", t0 - Duration::from_secs(30)).unwrap();
        assert_eq!(age, Duration::ZERO);
    }
}
