//! Configuration for the reconciler.

use crate::operation::Operation;
use crate::retry::RetryPolicy;

/// How Delete reaches the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteStrategy {
    /// Use the transport's delete-by-identity call (`DELETE` by default).
    #[default]
    ByIdentity,
    /// POST the object with a `deleted` lifecycle status.
    StatusDeleted,
}

/// Configuration for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Retry policy for Create.
    pub create: RetryPolicy,
    /// Retry policy for Read, also used by the refresh after a write.
    pub read: RetryPolicy,
    /// Retry policy for Update.
    pub update: RetryPolicy,
    /// Retry policy for Delete.
    pub delete: RetryPolicy,
    /// How Delete is issued.
    pub delete_strategy: DeleteStrategy,
    /// Whether Create and Update re-read the object before projecting.
    pub refresh_after_write: bool,
}

impl ReconcileConfig {
    /// Creates a configuration that retries every operation with jittered
    /// backoff.
    pub fn new() -> Self {
        Self::with_retry(RetryPolicy::default())
    }

    /// Creates a configuration using `policy` for every operation.
    pub fn with_retry(policy: RetryPolicy) -> Self {
        Self {
            create: policy.clone(),
            read: policy.clone(),
            update: policy.clone(),
            delete: policy,
            delete_strategy: DeleteStrategy::ByIdentity,
            refresh_after_write: true,
        }
    }

    /// Creates the configuration of the latest provider generation: no
    /// backoff, and Update and Delete make a single attempt.
    pub fn most_recent() -> Self {
        Self::with_retry(RetryPolicy::immediate(3))
            .with_policy(Operation::Update, RetryPolicy::no_retry())
            .with_policy(Operation::Delete, RetryPolicy::no_retry())
    }

    /// Sets the retry policy of one operation.
    pub fn with_policy(mut self, operation: Operation, policy: RetryPolicy) -> Self {
        *self.policy_mut(operation) = policy;
        self
    }

    /// Sets the delete strategy.
    pub fn with_delete_strategy(mut self, strategy: DeleteStrategy) -> Self {
        self.delete_strategy = strategy;
        self
    }

    /// Enables or disables the refresh after a write.
    pub fn with_refresh_after_write(mut self, refresh: bool) -> Self {
        self.refresh_after_write = refresh;
        self
    }

    /// Returns the retry policy of one operation.
    pub fn policy(&self, operation: Operation) -> &RetryPolicy {
        match operation {
            Operation::Create => &self.create,
            Operation::Read => &self.read,
            Operation::Update => &self.update,
            Operation::Delete => &self.delete,
        }
    }

    fn policy_mut(&mut self, operation: Operation) -> &mut RetryPolicy {
        match operation {
            Operation::Create => &mut self.create,
            Operation::Read => &mut self.read,
            Operation::Update => &mut self.update,
            Operation::Delete => &mut self.delete,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::Backoff;

    #[test]
    fn default_config_retries_everything_with_backoff() {
        let config = ReconcileConfig::default();
        for op in Operation::ALL {
            let policy = config.policy(op);
            assert_eq!(policy.max_retries, 3);
            assert_eq!(policy.backoff, Some(Backoff::default()));
        }
        assert_eq!(config.delete_strategy, DeleteStrategy::ByIdentity);
        assert!(config.refresh_after_write);
    }

    #[test]
    fn most_recent_generation() {
        let config = ReconcileConfig::most_recent();
        assert_eq!(config.policy(Operation::Create), &RetryPolicy::immediate(3));
        assert_eq!(config.policy(Operation::Read), &RetryPolicy::immediate(3));
        assert_eq!(config.policy(Operation::Update).max_attempts(), 1);
        assert_eq!(config.policy(Operation::Delete).max_attempts(), 1);
    }

    #[test]
    fn config_builder() {
        let config = ReconcileConfig::with_retry(RetryPolicy::immediate(1))
            .with_policy(Operation::Read, RetryPolicy::immediate(7))
            .with_delete_strategy(DeleteStrategy::StatusDeleted)
            .with_refresh_after_write(false);

        assert_eq!(config.policy(Operation::Create).max_retries, 1);
        assert_eq!(config.policy(Operation::Read).max_retries, 7);
        assert_eq!(config.delete_strategy, DeleteStrategy::StatusDeleted);
        assert!(!config.refresh_after_write);
    }
}
