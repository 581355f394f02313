// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service assembly: stores, queue, dispatcher, processor, intake

use crate::config::Config;
use crate::handlers::{ExecutePlanJobHandler, GeneratePlanJobHandler};
use crate::payload::{EXECUTE_PLAN, GENERATE_PLAN};
use crate::webhook::WebhookHandler;
use mend_adapters::agent::AgentAdapter;
use mend_adapters::container::ContainerAdapter;
use mend_adapters::platform::PlatformAdapter;
use mend_core::Clock;
use mend_engine::audit_log::{AuditLog, AuditStore, InMemoryAuditStore};
use mend_engine::cancel::CancelLedger;
use mend_engine::dedup::DedupRegistry;
use mend_engine::dispatch::Dispatcher;
use mend_engine::health::HealthAggregator;
use mend_engine::processor::{Processor, ProcessorConfig};
use mend_engine::queue::JobQueue;
use mend_engine::retention::RetentionCleaner;
use mend_engine::status_store::{InMemoryStatusStore, JobStatusStore};
use mend_engine::task_store::{InMemoryTaskStore, TaskStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// External collaborators handed to [`ServiceRuntime::build`].
pub struct ServiceDeps<P, K, A>
where
    P: PlatformAdapter,
    K: ContainerAdapter,
    A: AgentAdapter,
{
    pub platform: Arc<P>,
    pub containers: Arc<K>,
    pub agent: Arc<A>,
}

/// Fully wired service: webhook intake on one side, draft pull
/// requests on the other.
pub struct ServiceRuntime<C, P, K, A>
where
    C: Clock,
    P: PlatformAdapter,
    K: ContainerAdapter,
    A: AgentAdapter,
{
    queue: Arc<JobQueue>,
    statuses: Arc<dyn JobStatusStore>,
    tasks: Arc<dyn TaskStore>,
    audit: AuditLog<C>,
    dispatcher: Arc<Dispatcher<C>>,
    processor: Arc<Processor<C>>,
    webhook: WebhookHandler<C>,
    health: HealthAggregator<C>,
    cleaner: RetentionCleaner<C>,
    // Deps are owned by the handlers; kept here for introspection.
    _deps: ServiceDeps<P, K, A>,
}

impl<C, P, K, A> ServiceRuntime<C, P, K, A>
where
    C: Clock,
    P: PlatformAdapter,
    K: ContainerAdapter,
    A: AgentAdapter,
{
    /// Validate `config` and assemble the full pipeline with in-memory
    /// stores.
    pub fn build(
        config: Config,
        deps: ServiceDeps<P, K, A>,
        clock: C,
    ) -> Result<Self, crate::config::ConfigError> {
        config.validate()?;

        let queue = if config.background.enable_prioritization {
            Arc::new(JobQueue::prioritized(config.background.max_queue_size))
        } else {
            Arc::new(JobQueue::bounded(config.background.max_queue_size))
        };
        let statuses: Arc<dyn JobStatusStore> = Arc::new(InMemoryStatusStore::new());
        let tasks: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let audit_store: Arc<dyn AuditStore> = Arc::new(InMemoryAuditStore::default());
        let audit = AuditLog::new(Arc::clone(&audit_store), clock.clone());
        let dedup = Arc::new(DedupRegistry::new());
        let cancels = Arc::new(CancelLedger::new());

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&statuses),
            Arc::clone(&dedup),
            Arc::clone(&cancels),
            audit.clone(),
            clock.clone(),
        ));

        dispatcher.register_handler(Arc::new(GeneratePlanJobHandler::new(
            Arc::clone(&tasks),
            Arc::clone(&dispatcher),
            Arc::clone(&deps.agent),
            audit.clone(),
            clock.clone(),
        )));
        dispatcher.register_handler(Arc::new(ExecutePlanJobHandler::new(
            Arc::clone(&tasks),
            Arc::clone(&deps.platform),
            Arc::clone(&deps.containers),
            Arc::clone(&deps.agent),
            audit.clone(),
            clock.clone(),
        )));

        let mut timeouts = HashMap::new();
        timeouts.insert(
            GENERATE_PLAN.to_string(),
            Duration::from_secs(config.background.plan_timeout_seconds),
        );
        timeouts.insert(
            EXECUTE_PLAN.to_string(),
            Duration::from_secs(config.background.execution_timeout_seconds),
        );
        let processor_config = ProcessorConfig {
            max_concurrency: config.background.max_concurrency,
            retry: config.background.retry.to_policy(),
            timeouts,
            drain: Duration::from_secs(10),
        };
        let processor = Arc::new(Processor::new(
            Arc::clone(&dispatcher),
            Arc::clone(&queue),
            Arc::clone(&statuses),
            dedup,
            cancels,
            audit.clone(),
            clock.clone(),
            processor_config,
        ));

        let webhook = WebhookHandler::new(
            Arc::clone(&tasks),
            Arc::clone(&dispatcher),
            audit.clone(),
            clock.clone(),
            config.background.retry.max_retries,
        );
        let health =
            HealthAggregator::new(Arc::clone(&statuses), Arc::clone(&queue), clock.clone());
        let cleaner = RetentionCleaner::new(
            audit_store,
            Arc::clone(&statuses),
            audit.clone(),
            clock,
            config.audit.retention_days,
        );

        Ok(Self {
            queue,
            statuses,
            tasks,
            audit,
            dispatcher,
            processor,
            webhook,
            health,
            cleaner,
            _deps: deps,
        })
    }

    /// Start the worker pool. Handlers are already registered.
    pub fn start(&self) {
        self.processor.start();
    }

    /// Drain and stop the worker pool.
    pub async fn shutdown(&self) {
        self.processor.shutdown().await;
    }

    pub fn webhook(&self) -> &WebhookHandler<C> {
        &self.webhook
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<C>> {
        &self.dispatcher
    }

    pub fn health(&self) -> &HealthAggregator<C> {
        &self.health
    }

    pub fn cleaner(&self) -> &RetentionCleaner<C> {
        &self.cleaner
    }

    pub fn statuses(&self) -> &Arc<dyn JobStatusStore> {
        &self.statuses
    }

    pub fn tasks(&self) -> &Arc<dyn TaskStore> {
        &self.tasks
    }

    pub fn audit(&self) -> &AuditLog<C> {
        &self.audit
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
