use fxhash::FxHashMap as HashMap;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

/// A pre-interned, O(1)-lookup token identifying a trait by name and binding
/// the Rust type of its value. Tokens are produced by [`TraitInterner::intern`]
/// and are stable for the lifetime of the interner they came from.
///
/// Modeled on `json::schema::intern::Table`'s bitset interning, generalized
/// from presence-only bits to a dense index so each schema's trait map can
/// store an arbitrary payload per trait rather than just a membership bit.
pub struct TraitKey<T> {
    pub(crate) index: u32,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for TraitKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for TraitKey<T> {}

impl<T> std::fmt::Debug for TraitKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TraitKey({}, #{})", self.name, self.index)
    }
}

impl<T> TraitKey<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Assigns a dense `u32` index to each distinct trait name on first use.
/// Shared (via `Arc`) between a [`crate::Registry`] and every [`TraitMap`]
/// built against it, so indices stay comparable across schemas.
#[derive(Clone, Default)]
pub struct TraitInterner {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    by_name: HashMap<&'static str, u32>,
    names: Vec<&'static str>,
}

impl TraitInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning the same token on every call for the same
    /// name (even across different value types `T` — callers are trusted to
    /// be consistent, exactly as `Context` keys trust their declared type).
    pub fn intern<T>(&self, name: &'static str) -> TraitKey<T> {
        let mut inner = self.inner.write().unwrap();
        let index = match inner.by_name.get(name) {
            Some(&index) => index,
            None => {
                let index = inner.names.len() as u32;
                inner.names.push(name);
                inner.by_name.insert(name, index);
                index
            }
        };
        TraitKey {
            index,
            name,
            _marker: PhantomData,
        }
    }

    fn len(&self) -> usize {
        self.inner.read().unwrap().names.len()
    }
}

/// Per-schema trait map: O(1) presence check and typed value lookup, indexed
/// directly by `TraitKey::index` rather than hashing the name again.
#[derive(Default)]
pub struct TraitMap {
    slots: Vec<Option<Arc<dyn Any + Send + Sync>>>,
}

impl TraitMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + Sync + 'static>(&mut self, key: TraitKey<T>, value: T) {
        let idx = key.index as usize;
        if self.slots.len() <= idx {
            self.slots.resize_with(idx + 1, || None);
        }
        self.slots[idx] = Some(Arc::new(value));
    }

    pub fn has(&self, key: TraitKey<impl Any>) -> bool {
        self.slots
            .get(key.index as usize)
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    /// Look up a trait's value. Returns `None` both when the trait is absent
    /// and when it's present under a different `T` than was inserted with
    /// (a schema-construction bug, not a caller error — logged instead of
    /// panicking so a single malformed trait never poisons the registry).
    pub fn get<T: Send + Sync + 'static>(&self, key: TraitKey<T>) -> Option<&T> {
        let slot = self.slots.get(key.index as usize)?.as_ref()?;
        match slot.downcast_ref::<T>() {
            Some(v) => Some(v),
            None => {
                tracing::warn!(trait_name = key.name, "trait value type mismatch");
                None
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn intern_is_idempotent_and_dense() {
        let interner = TraitInterner::new();
        let a: TraitKey<bool> = interner.intern("sensitive");
        let b: TraitKey<bool> = interner.intern("required");
        let c: TraitKey<bool> = interner.intern("sensitive");

        assert_eq!(a.index, c.index);
        assert_ne!(a.index, b.index);
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn trait_map_lookup_is_typed() {
        let interner = TraitInterner::new();
        let sensitive: TraitKey<bool> = interner.intern("sensitive");
        let http_error: TraitKey<u16> = interner.intern("httpError");

        let mut map = TraitMap::new();
        map.insert(sensitive, true);

        assert!(map.has(sensitive));
        assert_eq!(map.get(sensitive), Some(&true));
        assert!(!map.has(http_error));
        assert_eq!(map.get(http_error), None);
    }
}
