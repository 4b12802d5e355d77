/// The hasher used by all collections of this crate.
pub type FxBuildHasher = fxhash::FxBuildHasher;

/// Type alias for sets, we use this to hide which type of `HashSet` we are actually using.
/// Iteration follows insertion order, which keeps every first-found choice reproducible.
pub type Set<S> = indexmap::IndexSet<S, FxBuildHasher>;

/// Type alias for maps, we use this to hide which type of `HashMap` we are actually using.
/// Like [`Set`], iteration follows insertion order.
pub type Map<K, V> = indexmap::IndexMap<K, V, FxBuildHasher>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_kept() {
        let set: Set<&str> = ["c", "a", "b", "a"].into_iter().collect();
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec!["c", "a", "b"]);

        let mut map = Map::default();
        map.insert(3, 'x');
        map.insert(1, 'y');
        assert_eq!(map.get_index(0), Some((&3, &'x')));
    }
}
