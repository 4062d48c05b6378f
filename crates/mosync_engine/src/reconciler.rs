//! Reconciliation state machine.
//!
//! Each operation runs `call -> interpret -> project` inside its retry
//! policy and only touches the spec once the whole sequence succeeded, so a
//! failed operation leaves identity and attributes as they were.

use crate::config::{DeleteStrategy, ReconcileConfig};
use crate::error::{ReconcileError, ReconcileResult};
use crate::interpret::{interpret, Interpretation};
use crate::object::ManagedObjectSpec;
use crate::operation::Operation;
use crate::project::{project, project_absent};
use crate::retry::{with_retry, RetryPolicy};
use crate::transport::RestTransport;
use mosync_protocol::{LifecycleStatus, Method, Payload};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Statistics about reconciliation operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Operations that finished successfully.
    pub operations_completed: u64,
    /// Operations that gave up.
    pub operations_failed: u64,
    /// Transport round trips attempted, across all operations.
    pub attempts: u64,
    /// Attempts beyond the first of each step.
    pub retries: u64,
    /// Reads that found the object deleted out of band.
    pub found_missing: u64,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Reconciles managed objects against a remote management API.
///
/// A reconciler holds no per-object state and can be shared across
/// threads, each working on its own [`ManagedObjectSpec`].
pub struct Reconciler<T: RestTransport> {
    config: ReconcileConfig,
    transport: Arc<T>,
    stats: RwLock<ReconcileStats>,
}

impl<T: RestTransport> Reconciler<T> {
    /// Creates a new reconciler.
    pub fn new(config: ReconcileConfig, transport: T) -> Self {
        Self::with_shared_transport(config, Arc::new(transport))
    }

    /// Creates a reconciler over a transport shared with other users.
    pub fn with_shared_transport(config: ReconcileConfig, transport: Arc<T>) -> Self {
        Self {
            config,
            transport,
            stats: RwLock::new(ReconcileStats::default()),
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Gets the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Gets the current stats.
    pub fn stats(&self) -> ReconcileStats {
        self.stats.read().clone()
    }

    /// Creates the object.
    ///
    /// Fails with [`ReconcileError::InvalidStateTransition`] if the spec
    /// already has an identity; use [`Reconciler::update`] for that.
    pub fn create(&self, spec: &mut ManagedObjectSpec) -> ReconcileResult<()> {
        if let Some(identity) = spec.identity() {
            return Err(ReconcileError::InvalidStateTransition {
                from: format!("existing object {identity}"),
                to: Operation::Create.to_string(),
            });
        }
        self.write(spec, Operation::Create)
    }

    /// Updates the object with the desired attributes.
    pub fn update(&self, spec: &mut ManagedObjectSpec) -> ReconcileResult<()> {
        self.write(spec, Operation::Update)
    }

    /// Reads the object back.
    ///
    /// If the object no longer exists remotely, the identity is cleared and
    /// the attributes are left untouched. That is not an error.
    pub fn read(&self, spec: &mut ManagedObjectSpec) -> ReconcileResult<()> {
        let span = info_span!("reconcile", dn = spec.dn(), operation = "read");
        let _enter = span.enter();
        debug!("beginning read");

        let observed = self.observe(spec, Operation::Read);
        let observed = self.finish(observed)?;

        match observed {
            Some(attributes) => {
                spec.attributes = attributes;
                spec.mark_present();
            }
            None => {
                info!("object no longer exists remotely");
                self.stats.write().found_missing += 1;
                spec.mark_absent();
            }
        }

        debug!("read finished successfully");
        Ok(())
    }

    /// Deletes the object.
    ///
    /// An object that is already gone counts as deleted. On success the
    /// identity is cleared unconditionally.
    pub fn delete(&self, spec: &mut ManagedObjectSpec) -> ReconcileResult<()> {
        let span = info_span!("reconcile", dn = spec.dn(), operation = "delete");
        let _enter = span.enter();
        debug!("beginning delete");

        let result = self.attempt(spec, Operation::Delete, &self.config.delete, |_| {
            let tree = match self.config.delete_strategy {
                DeleteStrategy::ByIdentity => self
                    .transport
                    .delete_by_identity(spec.dn(), spec.class_name())?,
                DeleteStrategy::StatusDeleted => {
                    let payload = Payload::build(
                        spec.class_name(),
                        &BTreeMap::new(),
                        Some(LifecycleStatus::Deleted),
                    )?;
                    self.transport
                        .call(Method::Post, &spec.path(), Some(&payload))?
                }
            };

            if let Interpretation::AlreadyAbsent(entry) = interpret(&tree, Operation::Delete)? {
                debug!(code = entry.code, text = %entry.text, "object already absent");
            }
            Ok(())
        });
        self.finish(result)?;

        spec.mark_absent();
        debug!("delete finished successfully");
        Ok(())
    }

    /// Create and Update: POST the desired state, then project.
    fn write(&self, spec: &mut ManagedObjectSpec, operation: Operation) -> ReconcileResult<()> {
        let span = info_span!("reconcile", dn = spec.dn(), %operation);
        let _enter = span.enter();
        debug!("beginning {operation}");

        let policy = self.config.policy(operation);
        let result = self.attempt(spec, operation, policy, |_| {
            let payload = Payload::build(spec.class_name(), &spec.attributes, operation.status())?;
            let tree = self
                .transport
                .call(operation.method(), &spec.path(), Some(&payload))?;

            if self.config.refresh_after_write {
                interpret(&tree, operation)?;
                return Ok(None);
            }
            match interpret(&tree, operation)? {
                Interpretation::Present => {
                    project(
                        spec.class_name(),
                        &spec.attributes,
                        &spec.ignored_attribute_keys,
                        &tree,
                    )
                    .map(Some)
                }
                Interpretation::Absent | Interpretation::AlreadyAbsent(_) => Ok(Some(
                    project_absent(&spec.attributes, &spec.ignored_attribute_keys),
                )),
            }
        });

        let observed = match result {
            Ok(Some(observed)) => Ok(observed),
            Ok(None) => self.observe(spec, operation).map(|observed| {
                observed.unwrap_or_else(|| {
                    warn!("object not visible right after {operation}");
                    project_absent(&spec.attributes, &spec.ignored_attribute_keys)
                })
            }),
            Err(err) => Err(err),
        };
        let observed = self.finish(observed)?;

        spec.attributes = observed;
        spec.mark_present();
        debug!("{operation} finished successfully");
        Ok(())
    }

    /// GETs the object and projects it. `None` means the object is absent.
    ///
    /// Runs under the read policy; failures are reported as part of
    /// `operation`.
    fn observe(
        &self,
        spec: &ManagedObjectSpec,
        operation: Operation,
    ) -> ReconcileResult<Option<BTreeMap<String, String>>> {
        self.attempt(spec, operation, &self.config.read, |_| {
            let tree = self.transport.call(Operation::Read.method(), &spec.path(), None)?;
            match interpret(&tree, Operation::Read)? {
                Interpretation::Present => project(
                    spec.class_name(),
                    &spec.attributes,
                    &spec.ignored_attribute_keys,
                    &tree,
                )
                .map(Some),
                Interpretation::Absent | Interpretation::AlreadyAbsent(_) => Ok(None),
            }
        })
    }

    /// Runs one step under `policy`, counting attempts and wrapping a final
    /// failure with the object and operation.
    fn attempt<R>(
        &self,
        spec: &ManagedObjectSpec,
        operation: Operation,
        policy: &RetryPolicy,
        mut step: impl FnMut(u32) -> ReconcileResult<R>,
    ) -> ReconcileResult<R> {
        let mut attempts = 0u32;
        let result = with_retry(policy, |attempt| {
            attempts = attempt + 1;
            step(attempt)
        });

        {
            let mut stats = self.stats.write();
            stats.attempts += u64::from(attempts);
            stats.retries += u64::from(attempts.saturating_sub(1));
        }

        result.map_err(|source| ReconcileError::Failed {
            dn: spec.dn().to_string(),
            operation,
            attempts,
            source: Box::new(source),
        })
    }

    /// Records the end of a public operation.
    fn finish<R>(&self, result: ReconcileResult<R>) -> ReconcileResult<R> {
        let mut stats = self.stats.write();
        match &result {
            Ok(_) => stats.operations_completed += 1,
            Err(err) => {
                warn!(error = %err, "operation failed");
                stats.operations_failed += 1;
                stats.last_error = Some(err.to_string());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use mosync_protocol::ResponseTree;
    use serde_json::{json, Map, Value};

    fn fast_config() -> ReconcileConfig {
        ReconcileConfig::with_retry(RetryPolicy::immediate(3))
    }

    fn tenant_spec() -> ManagedObjectSpec {
        ManagedObjectSpec::new("uni/tn-demo", "fvTenant")
            .unwrap()
            .with_attribute("name", "demo")
            .with_attribute("descr", "managed")
    }

    fn tenant(attrs: Value) -> ResponseTree {
        let attrs: Map<String, Value> = serde_json::from_value(attrs).unwrap();
        ResponseTree::with_object("fvTenant", attrs)
    }

    #[test]
    fn create_posts_then_reads_back() {
        let transport = MockTransport::new();
        transport.push_response(ResponseTree::empty());
        transport.push_response(tenant(json!({ "name": "demo", "descr": "managed", "uid": "0" })));

        let reconciler = Reconciler::new(fast_config(), transport);
        let mut spec = tenant_spec();
        reconciler.create(&mut spec).unwrap();

        assert_eq!(spec.identity(), Some("uni/tn-demo"));
        assert_eq!(spec.attributes.len(), 2);

        let calls = reconciler.transport().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].path, "/api/mo/uni/tn-demo.json");
        let payload = calls[0].payload.as_ref().unwrap();
        assert_eq!(payload.status(), Some(LifecycleStatus::CreatedModified));
        assert_eq!(calls[1].method, Method::Get);
        assert_eq!(reconciler.stats().operations_completed, 1);
    }

    #[test]
    fn create_projects_post_response_without_refresh() {
        let transport = MockTransport::new();
        transport.push_response(tenant(json!({ "name": "demo", "descr": "server" })));

        let reconciler =
            Reconciler::new(fast_config().with_refresh_after_write(false), transport);
        let mut spec = tenant_spec();
        reconciler.create(&mut spec).unwrap();

        assert_eq!(spec.attributes["descr"], "server");
        assert!(spec.exists());
        assert_eq!(reconciler.transport().call_count(), 1);
    }

    #[test]
    fn create_not_found_is_success_with_empty_observation() {
        let transport = MockTransport::new();
        transport.push_response(ResponseTree::empty());

        let reconciler =
            Reconciler::new(fast_config().with_refresh_after_write(false), transport);
        let mut spec = tenant_spec().with_ignored_key("descr");
        reconciler.create(&mut spec).unwrap();

        assert!(spec.exists());
        assert_eq!(spec.attributes.len(), 1);
        assert_eq!(spec.attributes["descr"], "managed");
    }

    #[test]
    fn create_rejects_existing_identity() {
        let reconciler = Reconciler::new(fast_config(), MockTransport::new());
        let mut spec = tenant_spec();
        spec.mark_present();

        let err = reconciler.create(&mut spec).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidStateTransition { .. }));
        assert_eq!(reconciler.transport().call_count(), 0);
    }

    #[test]
    fn remote_error_on_create_is_fatal_after_retries() {
        let transport = MockTransport::new();
        transport.set_fallback(Ok(ResponseTree::with_error(107, "Cannot delete object")));

        let reconciler = Reconciler::new(fast_config(), transport);
        let mut spec = tenant_spec();
        let err = reconciler.create(&mut spec).unwrap_err();

        match &err {
            ReconcileError::Failed {
                operation,
                attempts,
                dn,
                ..
            } => {
                assert_eq!(*operation, Operation::Create);
                assert_eq!(*attempts, 4);
                assert_eq!(dn, "uni/tn-demo");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.remote_code(), Some(107));
        assert!(!spec.exists());
        assert_eq!(reconciler.transport().call_count(), 4);
        assert_eq!(reconciler.stats().operations_failed, 1);
    }

    #[test]
    fn update_with_benign_code_is_fatal() {
        let transport = MockTransport::new();
        transport.set_fallback(Ok(ResponseTree::with_error(1, "object gone")));

        let reconciler = Reconciler::new(ReconcileConfig::most_recent(), transport);
        let mut spec = tenant_spec();
        spec.mark_present();

        let err = reconciler.update(&mut spec).unwrap_err();
        assert_eq!(err.remote_code(), Some(1));
        assert_eq!(reconciler.transport().call_count(), 1);
        assert!(spec.exists());
    }

    #[test]
    fn retry_ceiling_returns_final_error() {
        let transport = MockTransport::new();
        for n in 1..=4 {
            transport.push_error(ReconcileError::transport(format!("attempt {n}")));
        }

        let reconciler = Reconciler::new(fast_config(), transport);
        let mut spec = tenant_spec();
        let err = reconciler.read(&mut spec).unwrap_err();

        assert_eq!(err.root_cause(), &ReconcileError::transport("attempt 4"));
        assert_eq!(reconciler.transport().call_count(), 4);
        assert_eq!(reconciler.stats().retries, 3);
    }

    #[test]
    fn read_not_found_clears_identity() {
        let transport = MockTransport::new();
        transport.push_response(ResponseTree::parse(r#"{"imdata":[{}]}"#).unwrap());

        let reconciler = Reconciler::new(fast_config(), transport);
        let mut spec = tenant_spec();
        spec.mark_present();
        let before = spec.attributes.clone();

        reconciler.read(&mut spec).unwrap();

        assert!(!spec.exists());
        assert_eq!(spec.attributes, before);
        assert_eq!(reconciler.transport().call_count(), 1);
        assert_eq!(reconciler.stats().found_missing, 1);
    }

    #[test]
    fn read_projects_with_ignore_list() {
        let transport = MockTransport::new();
        transport.push_response(tenant(json!({ "a": "9", "b": "9" })));

        let reconciler = Reconciler::new(fast_config(), transport);
        let mut spec = ManagedObjectSpec::new("uni/tn-demo", "fvTenant")
            .unwrap()
            .with_attribute("a", "1")
            .with_attribute("b", "2")
            .with_ignored_key("b");

        reconciler.read(&mut spec).unwrap();

        assert_eq!(spec.attributes["a"], "9");
        assert_eq!(spec.attributes["b"], "2");
        assert_eq!(spec.identity(), Some("uni/tn-demo"));
    }

    #[test]
    fn read_retries_decode_errors() {
        let transport = MockTransport::new();
        transport.push_response(tenant(json!({ "name": { "nested": true } })));
        transport.push_response(tenant(json!({ "name": "demo", "descr": "ok" })));

        let reconciler = Reconciler::new(fast_config(), transport);
        let mut spec = tenant_spec();
        reconciler.read(&mut spec).unwrap();

        assert_eq!(spec.attributes["descr"], "ok");
        assert_eq!(reconciler.transport().call_count(), 2);
    }

    #[test]
    fn benign_delete_clears_identity() {
        let transport = MockTransport::new();
        transport.push_response(ResponseTree::with_error(107, "Cannot delete object"));

        let reconciler = Reconciler::new(fast_config(), transport);
        let mut spec = tenant_spec();
        spec.mark_present();

        reconciler.delete(&mut spec).unwrap();

        assert!(!spec.exists());
        let calls = reconciler.transport().calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Delete);
    }

    #[test]
    fn delete_by_status_posts_deleted() {
        let transport = MockTransport::new();
        transport.push_response(ResponseTree::with_error(1, "no such object"));

        let config = fast_config().with_delete_strategy(DeleteStrategy::StatusDeleted);
        let reconciler = Reconciler::new(config, transport);
        let mut spec = tenant_spec();
        spec.mark_present();

        reconciler.delete(&mut spec).unwrap();

        assert!(!spec.exists());
        let calls = reconciler.transport().calls();
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(
            calls[0].payload.as_ref().unwrap().status(),
            Some(LifecycleStatus::Deleted)
        );
    }

    #[test]
    fn delete_failure_keeps_identity() {
        let transport = MockTransport::new();
        transport.set_fallback(Ok(ResponseTree::with_error(403, "access denied")));

        let reconciler = Reconciler::new(ReconcileConfig::most_recent(), transport);
        let mut spec = tenant_spec();
        spec.mark_present();

        let err = reconciler.delete(&mut spec).unwrap_err();
        assert_eq!(err.remote_code(), Some(403));
        assert!(spec.exists());
        assert_eq!(reconciler.transport().call_count(), 1);
    }

    #[test]
    fn malformed_attributes_fail_without_retry() {
        let reconciler = Reconciler::new(fast_config(), MockTransport::new());
        let mut spec = tenant_spec().with_attribute("descr", "line\nbreak");

        let err = reconciler.create(&mut spec).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ReconcileError::MalformedAttributes { .. }
        ));
        assert_eq!(reconciler.transport().call_count(), 0);
        assert!(!spec.exists());
    }

    #[test]
    fn failed_refresh_leaves_spec_untouched() {
        let transport = MockTransport::new();
        transport.push_response(ResponseTree::empty());
        transport.set_fallback(Err(ReconcileError::transport("timed out")));

        let reconciler = Reconciler::new(fast_config(), transport);
        let mut spec = tenant_spec();
        let before = spec.clone();

        let err = reconciler.create(&mut spec).unwrap_err();
        assert_eq!(err.root_cause(), &ReconcileError::transport("timed out"));
        assert_eq!(spec, before);
        assert_eq!(reconciler.transport().call_count(), 5);
    }
}
