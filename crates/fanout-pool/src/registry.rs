use fanout_common::{FanoutError, Result};

use crate::endpoint::Endpoint;

/// Ordered, fixed-size collection of endpoints.
///
/// Membership is set once at construction and never changes. Only the
/// per-endpoint health flags move, each independently synchronized.
#[derive(Debug)]
pub struct PoolRegistry<T> {
    endpoints: Vec<Endpoint<T>>,
}

impl<T> PoolRegistry<T> {
    /// Builds a registry from the configured targets.
    ///
    /// # Errors
    /// Returns `FanoutError::Configuration` if `targets` is empty.
    pub fn new(targets: Vec<T>) -> Result<Self> {
        if targets.is_empty() {
            return Err(FanoutError::Configuration(
                "endpoint pool must contain at least one entry".to_string(),
            ));
        }

        Ok(Self {
            endpoints: targets.into_iter().map(Endpoint::new).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Always `false`: an empty registry cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Endpoint<T>> {
        self.endpoints.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Endpoint<T>> {
        self.endpoints.iter()
    }

    pub(crate) fn endpoints_slice(&self) -> &[Endpoint<T>] {
        &self.endpoints
    }

    /// Sets the health flag of one endpoint, returning its previous value.
    /// Returns `None` when `index` is out of range.
    pub fn set_health(&self, index: usize, healthy: bool) -> Option<bool> {
        self.endpoints.get(index).map(|e| e.set_health(healthy))
    }

    /// Health flag of one endpoint; out-of-range indices read as unhealthy.
    pub fn is_healthy(&self, index: usize) -> bool {
        self.endpoints.get(index).is_some_and(Endpoint::is_healthy)
    }

    pub fn healthy_count(&self) -> usize {
        self.endpoints.iter().filter(|e| e.is_healthy()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(n: usize) -> PoolRegistry<String> {
        PoolRegistry::new((0..n).map(|i| format!("node{}", i)).collect()).unwrap()
    }

    #[test]
    fn test_empty_pool_is_configuration_error() {
        let err = PoolRegistry::<String>::new(vec![]).unwrap_err();
        assert!(matches!(err, FanoutError::Configuration(_)));
    }

    #[test]
    fn test_registry_preserves_order() {
        let registry = registry(3);
        assert_eq!(registry.len(), 3);
        assert!(!registry.is_empty());
        let targets: Vec<&String> = registry.iter().map(|e| e.target()).collect();
        assert_eq!(targets, vec!["node0", "node1", "node2"]);
    }

    #[test]
    fn test_all_entries_start_healthy() {
        let registry = registry(4);
        assert_eq!(registry.healthy_count(), 4);
    }

    #[test]
    fn test_set_health_touches_only_one_entry() {
        let registry = registry(3);
        assert_eq!(registry.set_health(1, false), Some(true));

        assert!(registry.is_healthy(0));
        assert!(!registry.is_healthy(1));
        assert!(registry.is_healthy(2));
        assert_eq!(registry.healthy_count(), 2);
    }

    #[test]
    fn test_out_of_range_index() {
        let registry = registry(2);
        assert_eq!(registry.set_health(5, false), None);
        assert!(!registry.is_healthy(5));
        assert!(registry.get(2).is_none());
    }
}
