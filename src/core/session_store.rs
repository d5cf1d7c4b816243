//! Concurrent per-customer conversation state.
//!
//! Sessions live in a sharded [`DashMap`]; each entry is an
//! `Arc<Mutex<ConversationState>>`, so work on one customer's cart never
//! blocks the shards holding other customers. Every public operation locks a
//! single session for its whole read-modify-write. The map shard lock is never
//! held while waiting on a session lock except inside `expire_stale`, and no
//! code path takes a shard lock while holding a session lock.

use crate::domain::model::{CartLine, ConversationState};
use crate::domain::ports::{Clock, SystemClock};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

pub type SessionHandle = Arc<Mutex<ConversationState>>;

pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 30;

pub fn generate_session_id() -> String {
    format!("session_{}", uuid::Uuid::new_v4().simple())
}

/// Locks a session, recovering the state if a previous holder panicked.
pub fn lock_session(handle: &SessionHandle) -> MutexGuard<'_, ConversationState> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct SessionStore {
    sessions: DashMap<String, SessionHandle>,
    clock: Arc<dyn Clock>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: DashMap::new(),
            clock,
        }
    }

    /// Returns the state for `session_id`, creating it atomically when absent.
    ///
    /// A blank or missing id gets a freshly generated one; read it back with
    /// `ConversationState::session_id`.
    pub fn get_or_create(&self, session_id: Option<&str>) -> SessionHandle {
        let id = match session_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_session_id(),
        };

        let key = id.clone();
        self.sessions
            .entry(id)
            .or_insert_with(|| {
                tracing::debug!("🆕 Creating session {}", key);
                Arc::new(Mutex::new(ConversationState::new(key, self.clock.now())))
            })
            .value()
            .clone()
    }

    pub fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn with_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut ConversationState) -> R,
    ) -> Option<R> {
        let handle = self.get(session_id)?;
        let mut state = lock_session(&handle);
        Some(f(&mut state))
    }

    /// Records activity without changing anything else.
    pub fn touch(&self, session_id: &str) {
        let now = self.clock.now();
        self.with_session(session_id, |state| state.touch(now));
    }

    /// Merges `lines` into the session cart. No-op for an unknown session.
    pub fn add_to_cart(&self, session_id: &str, lines: Vec<CartLine>) {
        let now = self.clock.now();
        self.with_session(session_id, |state| {
            state.cart.add_all(lines);
            state.touch(now);
        });
    }

    /// Removes lines whose product name case-insensitively equals one of `product_names`.
    pub fn remove_from_cart<S: AsRef<str>>(&self, session_id: &str, product_names: &[S]) -> usize {
        let now = self.clock.now();
        self.with_session(session_id, |state| {
            let removed = state.cart.remove_named(product_names);
            state.touch(now);
            removed
        })
        .unwrap_or(0)
    }

    /// Snapshot copy of the cart lines.
    pub fn cart(&self, session_id: &str) -> Vec<CartLine> {
        self.with_session(session_id, |state| state.cart.lines().to_vec())
            .unwrap_or_default()
    }

    pub fn cart_total(&self, session_id: &str) -> f64 {
        self.with_session(session_id, |state| state.cart.total())
            .unwrap_or(0.0)
    }

    /// Drops the whole session. Returns whether it existed.
    pub fn clear(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn set_table(&self, session_id: &str, table_number: &str) {
        let now = self.clock.now();
        self.with_session(session_id, |state| {
            state.table_number = Some(table_number.to_string());
            state.touch(now);
        });
    }

    pub fn table(&self, session_id: &str) -> Option<String> {
        self.with_session(session_id, |state| state.table_number.clone())
            .flatten()
    }

    pub fn set_metadata(&self, session_id: &str, key: &str, value: serde_json::Value) {
        self.with_session(session_id, |state| {
            state.metadata.insert(key.to_string(), value);
        });
    }

    pub fn metadata(&self, session_id: &str, key: &str) -> Option<serde_json::Value> {
        self.with_session(session_id, |state| state.metadata.get(key).cloned())
            .flatten()
    }

    /// Removes every session idle for longer than `ttl` at `now`.
    /// Sessions without recorded activity are always removed.
    pub fn expire_stale(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        let mut expired = 0;
        self.sessions.retain(|_, handle| {
            let state = lock_session(handle);
            let keep = match state.last_activity {
                Some(last) => now.signed_duration_since(last) <= ttl,
                None => false,
            };
            if !keep {
                expired += 1;
            }
            keep
        });
        if expired > 0 {
            tracing::info!("🧹 Expired {} idle session(s)", expired);
        }
        expired
    }

    /// Runs `expire_stale` every `every` until the returned task is aborted.
    pub fn spawn_sweeper(self: &Arc<Self>, every: std::time::Duration, ttl: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                store.expire_stale(store.clock.now(), ttl);
            }
        })
    }

    #[cfg(test)]
    pub(crate) fn forget_activity(&self, session_id: &str) {
        self.with_session(session_id, |state| state.last_activity = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Product;

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Utc::now()),
            }
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn black_coffee(price: f64) -> Arc<Product> {
        Arc::new(Product::new(1, "Cà phê đen", "Cà phê", price))
    }

    #[test]
    fn test_get_or_create_returns_same_instance() {
        let store = SessionStore::new();
        let first = store.get_or_create(Some("abc"));
        let second = store.get_or_create(Some("abc"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_or_create_generates_id_for_blank() {
        let store = SessionStore::new();
        let a = store.get_or_create(None);
        let b = store.get_or_create(Some("   "));

        let a_id = lock_session(&a).session_id().to_string();
        let b_id = lock_session(&b).session_id().to_string();
        assert!(a_id.starts_with("session_"));
        assert_ne!(a_id, b_id);
        assert!(store.contains(&a_id));
        assert!(store.contains(&b_id));
    }

    #[test]
    fn test_add_to_cart_twice_keeps_one_line_and_first_price() {
        let store = SessionStore::new();
        store.get_or_create(Some("s1"));

        store.add_to_cart("s1", vec![CartLine::new(black_coffee(25000.0), 2, None)]);
        store.add_to_cart("s1", vec![CartLine::new(black_coffee(27000.0), 3, None)]);

        let cart = store.cart("s1");
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].quantity(), 5);
        assert_eq!(cart[0].unit_price(), 25000.0);
        assert_eq!(store.cart_total("s1"), 125000.0);
    }

    #[test]
    fn test_cart_is_a_snapshot() {
        let store = SessionStore::new();
        store.get_or_create(Some("s1"));
        store.add_to_cart("s1", vec![CartLine::new(black_coffee(25000.0), 1, None)]);

        let mut snapshot = store.cart("s1");
        snapshot.clear();

        assert_eq!(store.cart("s1").len(), 1);
    }

    #[test]
    fn test_unknown_session_operations_are_noops() {
        let store = SessionStore::new();

        store.add_to_cart("ghost", vec![CartLine::new(black_coffee(25000.0), 1, None)]);
        store.set_table("ghost", "5");
        assert_eq!(store.remove_from_cart("ghost", &["Cà phê đen"]), 0);
        assert!(store.cart("ghost").is_empty());
        assert_eq!(store.cart_total("ghost"), 0.0);
        assert!(store.table("ghost").is_none());
        assert!(!store.clear("ghost"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_from_cart_and_clear() {
        let store = SessionStore::new();
        store.get_or_create(Some("s1"));
        store.add_to_cart("s1", vec![CartLine::new(black_coffee(25000.0), 1, None)]);

        assert_eq!(store.remove_from_cart("s1", &["cà phê ĐEN"]), 1);
        assert!(store.cart("s1").is_empty());

        assert!(store.clear("s1"));
        assert!(!store.contains("s1"));
    }

    #[test]
    fn test_table_and_metadata() {
        let store = SessionStore::new();
        store.get_or_create(Some("s1"));

        store.set_table("s1", "B12");
        store.set_metadata("s1", "channel", serde_json::json!("kiosk"));

        assert_eq!(store.table("s1").as_deref(), Some("B12"));
        assert_eq!(store.metadata("s1", "channel"), Some(serde_json::json!("kiosk")));
    }

    #[test]
    fn test_expire_stale_removes_idle_sessions_only() {
        let clock = Arc::new(ManualClock::new());
        let store = SessionStore::with_clock(clock.clone());
        let ttl = Duration::minutes(DEFAULT_SESSION_TTL_MINUTES);

        store.get_or_create(Some("idle"));
        store.get_or_create(Some("busy"));

        clock.advance(Duration::minutes(20));
        store.add_to_cart("busy", vec![CartLine::new(black_coffee(25000.0), 1, None)]);

        clock.advance(Duration::minutes(15));
        let expired = store.expire_stale(clock.now(), ttl);

        assert_eq!(expired, 1);
        assert!(!store.contains("idle"));
        assert!(store.contains("busy"));
    }

    #[test]
    fn test_expire_stale_drops_sessions_without_activity() {
        let store = SessionStore::new();
        store.get_or_create(Some("s1"));
        store.forget_activity("s1");

        assert_eq!(store.expire_stale(Utc::now(), Duration::minutes(30)), 1);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sweeper_expires_sessions_in_background() {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(SessionStore::with_clock(clock.clone()));
        store.get_or_create(Some("s1"));
        clock.advance(Duration::minutes(31));

        let sweeper =
            store.spawn_sweeper(std::time::Duration::from_millis(10), Duration::minutes(30));
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert!(store.is_empty());
        sweeper.abort();
    }
}
