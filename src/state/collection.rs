//! Named collections of immutable pipeline-state objects.

use std::collections::HashMap;

use parking_lot::RwLock;

type AllocatorFn<T> = Box<dyn Fn(&str) -> Option<T> + Send + Sync>;

/// A fixed, named set of canonical state configurations.
///
/// The built-in entries are created exactly once when the collection is
/// constructed. Lookup is by case-sensitive name or by index in insertion
/// order. A miss never errors: an optional allocator callback gets one
/// chance to produce the state (its result is cached under that name), and
/// if that fails too the lookup reports `None` so callers can fall back to
/// a default.
pub struct StateCollection<T: Clone> {
    names: RwLock<Vec<String>>,
    states: RwLock<HashMap<String, T>>,
    allocator: Option<AllocatorFn<T>>,
}

impl<T: Clone> StateCollection<T> {
    /// Build a collection from its canonical entries.
    pub fn new(entries: Vec<(&str, T)>) -> Self {
        let mut names = Vec::with_capacity(entries.len());
        let mut states = HashMap::with_capacity(entries.len());
        for (name, state) in entries {
            names.push(name.to_string());
            states.insert(name.to_string(), state);
        }
        Self {
            names: RwLock::new(names),
            states: RwLock::new(states),
            allocator: None,
        }
    }

    /// Attach an allocator callback invoked on name misses.
    pub fn with_allocator(
        mut self,
        allocator: impl Fn(&str) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        self.allocator = Some(Box::new(allocator));
        self
    }

    /// Look up a state by name (case-sensitive).
    pub fn get(&self, name: &str) -> Option<T> {
        if let Some(state) = self.states.read().get(name) {
            return Some(state.clone());
        }

        let allocator = self.allocator.as_ref()?;
        let state = allocator(name)?;

        let mut states = self.states.write();
        // A racing lookup may have allocated the same name already.
        let entry = states.entry(name.to_string()).or_insert_with(|| {
            self.names.write().push(name.to_string());
            state
        });
        Some(entry.clone())
    }

    /// Look up a state by index in insertion order.
    pub fn get_index(&self, index: usize) -> Option<T> {
        let name = self.names.read().get(index)?.clone();
        self.states.read().get(&name).cloned()
    }

    /// Index of a name in insertion order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.read().iter().position(|n| n == name)
    }

    /// Whether the collection currently holds `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.states.read().contains_key(name)
    }

    /// Number of states in the collection.
    pub fn len(&self) -> usize {
        self.names.read().len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.names.read().is_empty()
    }

    /// The entry names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.names.read().clone()
    }
}

impl<T: Clone + std::fmt::Debug> std::fmt::Debug for StateCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCollection")
            .field("names", &*self.names.read())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_lookup_by_name_and_index() {
        let collection = StateCollection::new(vec![("A", 1u32), ("B", 2), ("C", 3)]);

        assert_eq!(collection.get("B"), Some(2));
        assert_eq!(collection.get_index(0), Some(1));
        assert_eq!(collection.get_index(2), Some(3));
        assert_eq!(collection.index_of("C"), Some(2));
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let collection = StateCollection::new(vec![("Opaque", 1u32)]);
        assert_eq!(collection.get("Opaque"), Some(1));
        assert_eq!(collection.get("opaque"), None);
    }

    #[test]
    fn test_miss_returns_none_without_allocator() {
        let collection = StateCollection::new(vec![("A", 1u32)]);
        assert_eq!(collection.get("missing"), None);
        assert_eq!(collection.get_index(5), None);
    }

    #[test]
    fn test_allocator_result_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_in_allocator = Arc::clone(&calls);

        let collection = StateCollection::new(vec![("A", 1u32)]).with_allocator(move |name| {
            calls_in_allocator.fetch_add(1, Ordering::SeqCst);
            (name == "Custom").then_some(42)
        });

        assert_eq!(collection.get("Custom"), Some(42));
        assert_eq!(collection.get("Custom"), Some(42));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(collection.len(), 2);

        // Allocator declines unknown names; miss stays a miss.
        assert_eq!(collection.get("Unknown"), None);
    }
}
