//! Executor naming.
//!
//! Pools are registered under `<service>Executor` (the default bounded
//! pool) or `<service>TransactionalExecutor<identifier>` (single-worker
//! pools, identifier possibly empty).

use std::fmt;

use serde::Serialize;

const EXECUTOR_SUFFIX: &str = "Executor";
const TRANSACTIONAL_SUFFIX: &str = "TransactionalExecutor";

/// Registry key of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ExecutorName(String);

impl ExecutorName {
    /// Name of the service's default bounded pool.
    #[must_use]
    pub fn bounded(service: &str) -> Self {
        Self(format!("{service}{EXECUTOR_SUFFIX}"))
    }

    /// Name of a transactional pool, optionally namespaced by `identifier`.
    #[must_use]
    pub fn transactional(service: &str, identifier: &str) -> Self {
        Self(format!("{service}{TRANSACTIONAL_SUFFIX}{identifier}"))
    }

    /// Wraps an arbitrary registry key, e.g. one received from tooling.
    #[must_use]
    pub fn from_raw(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns `true` if this name belongs to `service`.
    ///
    /// Matches on the full `<service>Executor` / `<service>TransactionalExecutor`
    /// prefix, so `"Storage"` does not claim `"StorageMetadataExecutor"`.
    #[must_use]
    pub fn belongs_to(&self, service: &str) -> bool {
        self.0.strip_prefix(service).is_some_and(|rest| {
            rest == EXECUTOR_SUFFIX || rest.starts_with(TRANSACTIONAL_SUFFIX)
        })
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutorName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ExecutorName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_follow_service_convention() {
        assert_eq!(ExecutorName::bounded("Storage").as_str(), "StorageExecutor");
        assert_eq!(
            ExecutorName::transactional("Storage", "").as_str(),
            "StorageTransactionalExecutor"
        );
        assert_eq!(
            ExecutorName::transactional("Database", "ref-42").to_string(),
            "DatabaseTransactionalExecutorref-42"
        );
    }

    #[test]
    fn belongs_to_matches_own_pools_only() {
        assert!(ExecutorName::bounded("Storage").belongs_to("Storage"));
        assert!(ExecutorName::transactional("Storage", "").belongs_to("Storage"));
        assert!(ExecutorName::transactional("Storage", "x").belongs_to("Storage"));
        assert!(!ExecutorName::bounded("StorageMetadata").belongs_to("Storage"));
        assert!(!ExecutorName::transactional("StorageMetadata", "").belongs_to("Storage"));
        assert!(!ExecutorName::bounded("Auth").belongs_to("Storage"));
    }

    #[test]
    fn raw_names_compare_equal_to_built_ones() {
        assert_eq!(
            ExecutorName::from_raw("AuthExecutor"),
            ExecutorName::bounded("Auth")
        );
    }
}
