use fxhash::FxHashMap as HashMap;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// A singleton token identifying one slot of request-scoped state, binding
/// the Rust type of its value (spec §3 Context: "Keys are singleton tokens
/// whose type parameter binds the value type"). Grounded on
/// `schema::TraitKey`'s interning shape, simplified: a `Context` is created
/// fresh per call rather than shared process-wide, so the key only needs a
/// stable name, not a per-registry dense index.
pub struct ContextKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    pub const fn new(name: &'static str) -> Self {
        ContextKey { name, _marker: PhantomData }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ContextKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for ContextKey<T> {}

/// Process-safe, typed key-value store for one call's request-scoped state
/// (spec §3 Context): identity, endpoint, retry attempt, idempotency
/// token, timeouts. Created per call; shared read/write among interceptors
/// within that call; never shared across calls (a fresh `Context::new()`
/// per `Pipeline::call`).
#[derive(Clone, Default)]
pub struct Context {
    slots: Arc<RwLock<HashMap<&'static str, Arc<dyn Any + Send + Sync>>>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + Sync + 'static>(&self, key: ContextKey<T>, value: T) {
        self.slots.write().unwrap().insert(key.name, Arc::new(value));
    }

    pub fn get<T: Send + Sync + Clone + 'static>(&self, key: ContextKey<T>) -> Option<T> {
        self.slots.read().unwrap().get(key.name).and_then(|v| v.downcast_ref::<T>().cloned())
    }

    pub fn contains<T: Send + Sync + 'static>(&self, key: ContextKey<T>) -> bool {
        self.slots.read().unwrap().contains_key(key.name)
    }

    pub fn remove<T: Send + Sync + 'static>(&self, key: ContextKey<T>) {
        self.slots.write().unwrap().remove(key.name);
    }
}

/// Context keys the core itself reads and writes (spec §5 ordering
/// guarantees, §4.4 pipeline steps).
pub mod well_known {
    use super::ContextKey;
    use std::time::Duration;

    /// Monotonically increasing starting at 1 (spec §5): the 1-based
    /// attempt number of the call currently in flight.
    pub const RETRY_ATTEMPT: ContextKey<u32> = ContextKey::new("runtime.retryAttempt");
    /// Cancels the whole call, all outstanding I/O (spec §4.4, §5).
    pub const API_CALL_TIMEOUT: ContextKey<Duration> = ContextKey::new("runtime.apiCallTimeout");
    /// Cancels only the current network round-trip (spec §4.4, §5).
    pub const API_CALL_ATTEMPT_TIMEOUT: ContextKey<Duration> = ContextKey::new("runtime.apiCallAttemptTimeout");
    pub const IDEMPOTENCY_TOKEN: ContextKey<String> = ContextKey::new("runtime.idempotencyToken");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_and_get_round_trip_by_type() {
        const COUNT: ContextKey<u32> = ContextKey::new("test.count");
        let ctx = Context::new();
        assert_eq!(ctx.get(COUNT), None);
        ctx.insert(COUNT, 7);
        assert_eq!(ctx.get(COUNT), Some(7));
    }

    #[test]
    fn cloned_context_shares_the_same_slots() {
        const NAME: ContextKey<String> = ContextKey::new("test.name");
        let ctx = Context::new();
        let cloned = ctx.clone();
        cloned.insert(NAME, "widget".to_string());
        assert_eq!(ctx.get(NAME), Some("widget".to_string()));
    }

    #[test]
    fn retry_attempt_is_a_well_known_key() {
        let ctx = Context::new();
        ctx.insert(well_known::RETRY_ATTEMPT, 1);
        assert_eq!(ctx.get(well_known::RETRY_ATTEMPT), Some(1));
    }
}
