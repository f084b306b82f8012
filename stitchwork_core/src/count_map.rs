// Copyright 2026 the Stitchwork Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference-counted create/destroy map.

use core::fmt;
use core::hash::Hash;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry as MapEntry;

/// A map whose values are created on first reference and destroyed on last
/// release.
///
/// The factory and destructor are injected at construction. Both receive a
/// caller-supplied context `Cx` on every call, so values can be backed by
/// resources owned elsewhere (for example a render strategy creating a
/// gradient element) without the map borrowing that owner.
///
/// A value is reachable through [`get`](Self::get) only while its reference
/// count is at least one.
pub struct CountMap<K, V, Cx: ?Sized = ()> {
    entries: HashMap<K, Entry<V>>,
    create: fn(&mut Cx, &K) -> V,
    destroy: fn(&mut Cx, &K, V),
}

struct Entry<V> {
    count: u32,
    value: V,
}

impl<K, V, Cx: ?Sized> fmt::Debug for CountMap<K, V, Cx>
where
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountMap")
            .field("len", &self.entries.len())
            .field("keys", &self.entries.keys().collect::<alloc::vec::Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<K: Eq + Hash, V, Cx: ?Sized> CountMap<K, V, Cx> {
    /// Creates an empty map with the given factory and destructor.
    #[must_use]
    pub fn new(create: fn(&mut Cx, &K) -> V, destroy: fn(&mut Cx, &K, V)) -> Self {
        Self {
            entries: HashMap::new(),
            create,
            destroy,
        }
    }

    /// Adds `n` references to `key`, creating its value on first reference.
    ///
    /// Returns the (possibly just created) value.
    pub fn increment(&mut self, cx: &mut Cx, key: K, n: u32) -> &V {
        debug_assert!(n >= 1, "CountMap increments must be positive");
        match self.entries.entry(key) {
            MapEntry::Occupied(occupied) => {
                let entry = occupied.into_mut();
                entry.count += n;
                &entry.value
            }
            MapEntry::Vacant(vacant) => {
                let value = (self.create)(cx, vacant.key());
                &vacant.insert(Entry { count: n, value }).value
            }
        }
    }

    /// Removes `n` references from `key`.
    ///
    /// When the count drops below one, the value is handed to the destructor
    /// and the entry is removed.
    pub fn decrement(&mut self, cx: &mut Cx, key: &K, n: u32) {
        debug_assert!(
            self.entries.contains_key(key),
            "CountMap decrement of a key with no references"
        );
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };
        debug_assert!(
            entry.count >= n,
            "CountMap decrement by {n} exceeds count {}",
            entry.count
        );
        entry.count = entry.count.saturating_sub(n);
        if entry.count < 1
            && let Some((key, entry)) = self.entries.remove_entry(key)
        {
            (self.destroy)(cx, &key, entry.value);
        }
    }

    /// Returns the value for `key` if it has at least one reference.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key).map(|entry| &entry.value)
    }

    /// Returns the reference count of `key` (zero if absent).
    #[must_use]
    pub fn count(&self, key: &K) -> u32 {
        self.entries.get(key).map_or(0, |entry| entry.count)
    }

    /// Returns the number of live keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no key is referenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destroys every value regardless of its count.
    pub fn clear(&mut self, cx: &mut Cx) {
        for (key, entry) in self.entries.drain() {
            (self.destroy)(cx, &key, entry.value);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;

    use super::*;

    fn create(log: &mut Vec<String>, key: &&'static str) -> String {
        log.push(alloc::format!("create {key}"));
        key.to_uppercase()
    }

    fn destroy(log: &mut Vec<String>, key: &&'static str, value: String) {
        log.push(alloc::format!("destroy {key}={value}"));
    }

    fn map() -> CountMap<&'static str, String, Vec<String>> {
        CountMap::new(create, destroy)
    }

    #[test]
    fn increment_twice_decrement_once_keeps_value() {
        let mut log = Vec::new();
        let mut counts = map();

        counts.increment(&mut log, "k", 1);
        counts.increment(&mut log, "k", 1);
        counts.decrement(&mut log, &"k", 1);

        assert_eq!(counts.count(&"k"), 1);
        assert_eq!(counts.get(&"k").map(String::as_str), Some("K"));
        assert_eq!(log, ["create k".to_string()]);

        counts.decrement(&mut log, &"k", 1);
        assert_eq!(counts.get(&"k"), None);
        assert_eq!(counts.count(&"k"), 0);
        assert!(counts.is_empty());
        assert_eq!(log, ["create k".to_string(), "destroy k=K".to_string()]);
    }

    #[test]
    fn bulk_counts() {
        let mut log = Vec::new();
        let mut counts = map();

        let value = counts.increment(&mut log, "a", 3).clone();
        assert_eq!(value, "A");
        counts.decrement(&mut log, &"a", 2);
        assert_eq!(counts.count(&"a"), 1);
        counts.decrement(&mut log, &"a", 1);
        assert_eq!(log.len(), 2, "one create and one destroy: {log:?}");
    }

    #[test]
    fn factory_runs_once_per_lifetime() {
        let mut log = Vec::new();
        let mut counts = map();

        counts.increment(&mut log, "a", 1);
        counts.decrement(&mut log, &"a", 1);
        counts.increment(&mut log, "a", 1);

        let creates = log.iter().filter(|line| line.starts_with("create")).count();
        assert_eq!(creates, 2, "value is recreated after full release");
    }

    #[test]
    fn clear_destroys_everything() {
        let mut log = Vec::new();
        let mut counts = map();

        counts.increment(&mut log, "a", 2);
        counts.increment(&mut log, "b", 1);
        counts.clear(&mut log);

        assert!(counts.is_empty());
        let destroys = log.iter().filter(|line| line.starts_with("destroy")).count();
        assert_eq!(destroys, 2);
    }
}
