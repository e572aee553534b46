//! Collection Scheduler
//!
//! Fans out over enabled (customer, provider, data_type) tuples from the
//! credential store. Two entry points: the periodic cron tick and
//! on-demand triggers. Concurrency is bounded by a global worker pool and
//! a per-provider limit so provider rate limits hold; every attempt lands
//! in collection_history. Failed tuples are not retried eagerly, the next
//! tick is the retry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration as ChronoDuration, Utc};
use core_config::scheduler::SchedulerConfig;
use domain_credentials::{CredentialRepository, CredentialService};
use domain_telemetry::{CloudProvider, DataType, MetricsWriter, TimeWindow};
use observability::CollectionMetrics;
use serde::Serialize;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::adapters::{AdapterRegistry, CollectContext};
use crate::error::{CollectionError, CollectionResult};
use crate::history::{CollectionHistoryRepository, CursorRepository};
use crate::models::{
    CollectionRequest, CollectionRunReport, CollectionStatus, HistoryRecord, TriggerOutcome,
};

/// Scheduler status surface (`GET /api/v1/collect/status`)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScheduleStatus {
    pub registered_adapters: usize,
    pub enabled_tuples: usize,
    pub worker_pool_size: usize,
    pub per_provider_concurrency: usize,
    pub cron: String,
}

/// The collection scheduler
pub struct CollectionScheduler<R: CredentialRepository> {
    credentials: Arc<CredentialService<R>>,
    registry: Arc<AdapterRegistry>,
    writer: Arc<dyn MetricsWriter>,
    history: Arc<dyn CollectionHistoryRepository>,
    cursors: Arc<dyn CursorRepository>,
    config: SchedulerConfig,
    workers: Arc<Semaphore>,
    provider_limits: HashMap<CloudProvider, Arc<Semaphore>>,
}

impl<R: CredentialRepository + 'static> CollectionScheduler<R> {
    pub fn new(
        credentials: Arc<CredentialService<R>>,
        registry: Arc<AdapterRegistry>,
        writer: Arc<dyn MetricsWriter>,
        history: Arc<dyn CollectionHistoryRepository>,
        cursors: Arc<dyn CursorRepository>,
        config: SchedulerConfig,
    ) -> Self {
        let workers = Arc::new(Semaphore::new(config.worker_pool_size));

        let provider_limits = [
            CloudProvider::Aws,
            CloudProvider::Gcp,
            CloudProvider::Azure,
            CloudProvider::Vultr,
            CloudProvider::Runpod,
        ]
        .into_iter()
        .map(|p| (p, Arc::new(Semaphore::new(config.per_provider_concurrency))))
        .collect();

        Self {
            credentials,
            registry,
            writer,
            history,
            cursors,
            config,
            workers,
            provider_limits,
        }
    }

    /// The adapter registry this scheduler fans out over
    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// Fetch one history row (async triggers are polled through this)
    pub async fn history_record(&self, id: Uuid) -> CollectionResult<Option<HistoryRecord>> {
        self.history.get(id).await
    }

    pub async fn status(&self) -> CollectionResult<ScheduleStatus> {
        let tuples = self.credentials.enabled_tuples().await?;
        Ok(ScheduleStatus {
            registered_adapters: self.registry.len(),
            enabled_tuples: tuples.len(),
            worker_pool_size: self.config.worker_pool_size,
            per_provider_concurrency: self.config.per_provider_concurrency,
            cron: self.config.cron.clone(),
        })
    }

    /// On-demand trigger. With `async_mode` the history id comes back
    /// immediately and the run continues in the background; otherwise the
    /// call blocks until the attempt completes.
    pub async fn trigger(
        self: &Arc<Self>,
        request: CollectionRequest,
    ) -> CollectionResult<TriggerOutcome> {
        let data_types = if request.data_types.is_empty() {
            self.registry.data_types_for(request.provider)
        } else {
            request.data_types.clone()
        };

        if data_types.is_empty() {
            return Err(CollectionError::NoAdapter(request.provider.to_string()));
        }

        let record = self
            .history
            .start(request.customer_id, request.provider, data_types.clone())
            .await?;

        if request.async_mode {
            let scheduler = self.clone();
            let history_id = record.id;
            tokio::spawn(async move {
                if let Err(e) = scheduler
                    .run_attempt(history_id, request.customer_id, request.provider, data_types)
                    .await
                {
                    error!(history_id = %history_id, error = %e, "Async collection attempt failed");
                }
            });
            Ok(TriggerOutcome::Queued(record))
        } else {
            let report = self
                .run_attempt(record.id, request.customer_id, request.provider, data_types)
                .await?;
            Ok(TriggerOutcome::Completed(report))
        }
    }

    /// One periodic tick: fan out over every enabled tuple, grouped per
    /// (customer, provider) so each group lands as one history attempt.
    pub async fn run_tick(self: &Arc<Self>) {
        let tuples = match self.credentials.enabled_tuples().await {
            Ok(tuples) => tuples,
            Err(e) => {
                error!(error = %e, "Failed to enumerate collection tuples");
                return;
            }
        };

        let mut groups: HashMap<(Uuid, CloudProvider), Vec<DataType>> = HashMap::new();
        for tuple in tuples {
            // Skip tuples no adapter serves
            if self.registry.get(tuple.provider, tuple.data_type).is_none() {
                continue;
            }
            groups
                .entry((tuple.customer_id, tuple.provider))
                .or_default()
                .push(tuple.data_type);
        }

        info!(groups = groups.len(), "Collection tick starting");

        let mut join_set: JoinSet<()> = JoinSet::new();

        for ((customer_id, provider), data_types) in groups {
            let scheduler = self.clone();

            join_set.spawn(async move {
                let record = match scheduler
                    .history
                    .start(customer_id, provider, data_types.clone())
                    .await
                {
                    Ok(record) => record,
                    Err(e) => {
                        error!(error = %e, "Failed to open history row, skipping tuple group");
                        return;
                    }
                };

                if let Err(e) = scheduler
                    .run_attempt(record.id, customer_id, provider, data_types)
                    .await
                {
                    error!(
                        history_id = %record.id,
                        customer_id = %customer_id,
                        provider = %provider,
                        error = %e,
                        "Collection attempt failed"
                    );
                }
            });
        }

        while join_set.join_next().await.is_some() {}
        info!("Collection tick complete");
    }

    /// Run as a scheduled service until shutdown is signalled
    pub async fn run_scheduled(
        self: Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> CollectionResult<()> {
        info!(cron = %self.config.cron, "Starting scheduled collection");

        let mut sched = JobScheduler::new()
            .await
            .map_err(|e| CollectionError::Internal(format!("scheduler init: {e}")))?;

        let scheduler = self.clone();
        let job = Job::new_async(self.config.cron.as_str(), move |_uuid, _l| {
            let scheduler = scheduler.clone();
            Box::pin(async move {
                scheduler.run_tick().await;
            })
        })
        .map_err(|e| CollectionError::Internal(format!("cron job: {e}")))?;

        sched
            .add(job)
            .await
            .map_err(|e| CollectionError::Internal(format!("cron add: {e}")))?;
        sched
            .start()
            .await
            .map_err(|e| CollectionError::Internal(format!("cron start: {e}")))?;

        // Park until shutdown; the cron scheduler runs on its own tasks
        while !*shutdown.borrow() {
            if shutdown.changed().await.is_err() {
                break;
            }
        }

        info!("Scheduled collection stopping");
        let _ = sched.shutdown().await;
        Ok(())
    }

    /// Execute one attempt against an already-created history row
    async fn run_attempt(
        &self,
        history_id: Uuid,
        customer_id: Uuid,
        provider: CloudProvider,
        data_types: Vec<DataType>,
    ) -> CollectionResult<CollectionRunReport> {
        let start = Instant::now();

        // Bound concurrency: global pool first, then the provider slot
        let _worker = self
            .workers
            .acquire()
            .await
            .map_err(|_| CollectionError::Internal("worker pool closed".into()))?;
        let _provider_slot = match self.provider_limits.get(&provider) {
            Some(limit) => Some(
                limit
                    .acquire()
                    .await
                    .map_err(|_| CollectionError::Internal("provider limit closed".into()))?,
            ),
            None => None,
        };

        let credential = match self
            .credentials
            .fetch_decrypted_for(customer_id, provider)
            .await
        {
            Ok(credential) => credential,
            Err(e) => {
                let message = format!("no usable credential: {e}");
                self.history
                    .complete(history_id, CollectionStatus::Failed, 0, Some(message.clone()))
                    .await?;
                return Err(CollectionError::NoCredential(message));
            }
        };

        let mut total_collected = 0usize;
        let mut errors: Vec<String> = Vec::new();
        let mut any_success = false;
        let mut credential_failed = false;

        for data_type in &data_types {
            let Some(adapter) = self.registry.get(provider, *data_type) else {
                errors.push(format!("{data_type}: no adapter registered"));
                continue;
            };

            CollectionMetrics::record_started(&provider.to_string(), &data_type.to_string());

            let cursor_state = self
                .cursors
                .get(customer_id, provider, *data_type)
                .await
                .unwrap_or(None);

            let window = self.compute_window(cursor_state.as_ref().and_then(|c| c.window_end));
            let ctx = CollectContext {
                customer_id,
                credential: credential.clone(),
                window,
                cursor: cursor_state.and_then(|c| c.cursor),
            };

            let collect_start = Instant::now();
            let result = tokio::time::timeout(
                std::time::Duration::from_secs(self.config.adapter_timeout_s),
                adapter.collect(&ctx),
            )
            .await;

            let output = match result {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    if e.is_credential_failure() {
                        credential_failed = true;
                    }
                    CollectionMetrics::record_failed(
                        &provider.to_string(),
                        &data_type.to_string(),
                        &e.to_string(),
                    );
                    errors.push(format!("{data_type}: {e}"));
                    continue;
                }
                Err(_) => {
                    CollectionMetrics::record_failed(
                        &provider.to_string(),
                        &data_type.to_string(),
                        "adapter deadline exceeded",
                    );
                    errors.push(format!(
                        "{data_type}: adapter deadline of {}s exceeded",
                        self.config.adapter_timeout_s
                    ));
                    continue;
                }
            };

            let partial_adapter = output.partial;
            errors.extend(
                output
                    .errors
                    .iter()
                    .map(|e| format!("{data_type}: {e}")),
            );

            let write_outcome = match self.writer.write_batch(output.batch).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    errors.push(format!("{data_type}: writer failed: {e}"));
                    continue;
                }
            };

            errors.extend(
                write_outcome
                    .errors
                    .iter()
                    .map(|e| format!("{data_type}: {e}")),
            );
            total_collected += write_outcome.written;
            any_success = true;

            // Persist pagination state; the window end becomes the start of
            // the next pull.
            if let Err(e) = self
                .cursors
                .upsert(
                    customer_id,
                    provider,
                    *data_type,
                    output.cursor,
                    Some(window.until),
                )
                .await
            {
                warn!(error = %e, "Failed to persist collection cursor");
            }

            let duration = collect_start.elapsed().as_secs_f64();
            if partial_adapter || write_outcome.rejected > 0 {
                CollectionMetrics::record_partial(
                    &provider.to_string(),
                    &data_type.to_string(),
                    write_outcome.written,
                );
            } else {
                CollectionMetrics::record_completed(
                    &provider.to_string(),
                    &data_type.to_string(),
                    write_outcome.written,
                    duration,
                );
            }
        }

        if credential_failed {
            // Auth refused: flip verification off so the tuple drops out of
            // the schedule until an operator intervenes.
            if let Err(e) = self.credentials.mark_verified(credential.id, false).await {
                warn!(error = %e, "Failed to clear credential verification");
            }
        }

        let status = if !any_success {
            CollectionStatus::Failed
        } else if errors.is_empty() {
            CollectionStatus::Success
        } else {
            CollectionStatus::Partial
        };

        let error_summary = if errors.is_empty() {
            None
        } else {
            Some(errors.join("; "))
        };

        self.history
            .complete(history_id, status, total_collected, error_summary)
            .await?;

        let report = CollectionRunReport {
            history_id,
            status,
            metrics_collected: total_collected,
            errors,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            history_id = %history_id,
            customer_id = %customer_id,
            provider = %provider,
            status = %report.status,
            metrics_collected = report.metrics_collected,
            duration_ms = report.duration_ms,
            "Collection attempt recorded"
        );

        Ok(report)
    }

    /// Window reaches from the last successful end (capped at the max
    /// lookback) up to now
    fn compute_window(&self, last_end: Option<chrono::DateTime<Utc>>) -> TimeWindow {
        let until = Utc::now();
        let floor = until - ChronoDuration::hours(self.config.max_lookback_hours);
        let since = match last_end {
            Some(end) if end > floor => end,
            _ => floor,
        };
        TimeWindow::new(since, until)
    }
}

