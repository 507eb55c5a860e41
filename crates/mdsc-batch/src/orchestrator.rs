//! # Batch Orchestrator
//!
//! One batch run, start to finish:
//!
//! 1. read candidate policies, drop superseded ones, drop those outside
//!    their date range;
//! 2. read published geographies;
//! 3. gather device/event inputs, once globally if any policy applies to
//!    every provider, otherwise once per referenced provider;
//! 4. evaluate every policy × provider pair on the blocking pool, one task
//!    per pair, and wrap each result in a snapshot;
//! 5. submit snapshots to the sink in fixed-size batches, concurrently.
//!
//! [`BatchOrchestrator::run`] wraps the whole sequence in the retry
//! supervisor. Steps 3 to 5 are plain functions so they can be exercised
//! without a process lifecycle.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use mdsc_core::{ComplianceSnapshot, Geography, Policy, ProviderId, Timestamp};
use mdsc_engine::{
    get_superseding_policies, is_policy_active, ComplianceClock, ComplianceProcessor, EngineError,
    ProviderInputs, SnapshotBuilder,
};

use crate::adapter::{
    AdapterError, ComplianceSnapshotSink, DeviceEventGateway, GeographyStore, PolicyStore,
};
use crate::config::BatchConfig;
use crate::error::BatchError;
use crate::retry::supervise;

/// The adapters one orchestrator reads from and writes to.
#[derive(Clone)]
pub struct BatchAdapters {
    pub policies: Arc<dyn PolicyStore>,
    pub geographies: Arc<dyn GeographyStore>,
    pub gateway: Arc<dyn DeviceEventGateway>,
    pub sink: Arc<dyn ComplianceSnapshotSink>,
}

impl std::fmt::Debug for BatchAdapters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchAdapters")
            .field("policies", &self.policies.adapter_name())
            .field("geographies", &self.geographies.adapter_name())
            .field("gateway", &self.gateway.adapter_name())
            .field("sink", &self.sink.adapter_name())
            .finish()
    }
}

/// Outcome of a successful batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub compliance_as_of: Timestamp,
    pub policies_evaluated: usize,
    pub snapshots_written: usize,
    pub total_violations: u64,
}

/// Drop superseded policies, then those not active at `now`.
pub fn select_policies(policies: Vec<Policy>, now: Timestamp) -> Vec<Policy> {
    get_superseding_policies(policies)
        .into_iter()
        .filter(|policy| {
            let active = is_policy_active(policy, now);
            if !active {
                tracing::debug!(policy_id = %policy.policy_id, "policy outside its date range, skipped");
            }
            active
        })
        .collect()
}

/// Fetch inputs for every provider the policies apply to, keyed by provider.
pub fn gather_inputs(
    gateway: &dyn DeviceEventGateway,
    policies: &[Policy],
) -> Result<HashMap<ProviderId, ProviderInputs>, AdapterError> {
    if policies.iter().any(|policy| policy.provider_restriction().is_none()) {
        return Ok(gateway.get_inputs(None)?.partition_by_provider());
    }

    let providers: BTreeSet<ProviderId> = policies
        .iter()
        .filter_map(Policy::provider_restriction)
        .flatten()
        .copied()
        .collect();
    let mut by_provider = HashMap::with_capacity(providers.len());
    for provider_id in providers {
        let mut parts = gateway.get_inputs(Some(&provider_id))?.partition_by_provider();
        if let Some(own) = parts.remove(&provider_id) {
            by_provider.insert(provider_id, own);
        }
    }
    Ok(by_provider)
}

/// Providers `policy` is evaluated for: its listed providers in order, or
/// every provider with inputs when unrestricted.
pub fn providers_for(policy: &Policy, inputs: &HashMap<ProviderId, ProviderInputs>) -> Vec<ProviderId> {
    match policy.provider_restriction() {
        Some(listed) => {
            let mut seen = BTreeSet::new();
            listed.iter().copied().filter(|p| seen.insert(*p)).collect()
        }
        None => {
            let mut all: Vec<ProviderId> = inputs.keys().copied().collect();
            all.sort();
            all
        }
    }
}

/// Evaluate one policy × provider pair. A provider without inputs is
/// evaluated against an empty fleet.
pub fn evaluate_pair(
    processor: &ComplianceProcessor,
    builder: &SnapshotBuilder,
    policy: &Policy,
    geographies: &[Geography],
    inputs: &HashMap<ProviderId, ProviderInputs>,
    provider_id: ProviderId,
) -> Result<ComplianceSnapshot, EngineError> {
    let empty = ProviderInputs::default();
    let provider_inputs = inputs.get(&provider_id).unwrap_or(&empty);
    let result = processor.process_policy(policy, geographies, provider_inputs)?;
    tracing::debug!(
        policy_id = %policy.policy_id,
        provider_id = %provider_id,
        vehicles_found = result.vehicles_found.len(),
        excess = result.excess_vehicles_count,
        total_violations = result.total_violations,
        "policy evaluated"
    );
    Ok(builder.build(policy, provider_id, result))
}

/// Evaluate every policy × provider pair in parallel, one blocking task per
/// pair. Snapshots come back in policy order, then provider order.
pub async fn compute_snapshots(
    policies: Vec<Policy>,
    geographies: Vec<Geography>,
    inputs: HashMap<ProviderId, ProviderInputs>,
    processor: ComplianceProcessor,
) -> Result<Vec<ComplianceSnapshot>, BatchError> {
    let builder = SnapshotBuilder::new(processor.clock().now());
    let geographies = Arc::new(geographies);
    let inputs = Arc::new(inputs);

    let mut tasks = Vec::new();
    for policy in policies {
        let policy = Arc::new(policy);
        for provider_id in providers_for(&policy, &inputs) {
            let policy = Arc::clone(&policy);
            let geographies = Arc::clone(&geographies);
            let inputs = Arc::clone(&inputs);
            tasks.push(tokio::task::spawn_blocking(move || {
                evaluate_pair(&processor, &builder, &policy, &geographies, &inputs, provider_id)
            }));
        }
    }

    let mut snapshots = Vec::with_capacity(tasks.len());
    for task in tasks {
        snapshots.push(task.await??);
    }
    Ok(snapshots)
}

/// Submit `snapshots` in chunks of `batch_size`, all chunks concurrently.
///
/// Every chunk is awaited before returning; the first failure is reported.
pub async fn submit_snapshots(
    sink: Arc<dyn ComplianceSnapshotSink>,
    snapshots: Vec<ComplianceSnapshot>,
    batch_size: usize,
) -> Result<usize, BatchError> {
    let tasks: Vec<_> = snapshots
        .chunks(batch_size.max(1))
        .map(|chunk| {
            let sink = Arc::clone(&sink);
            let chunk = chunk.to_vec();
            tokio::task::spawn_blocking(move || sink.write_batch(&chunk))
        })
        .collect();

    let mut first_error: Option<BatchError> = None;
    for task in tasks {
        let outcome = match task.await {
            Ok(written) => written.map_err(BatchError::from),
            Err(join) => Err(BatchError::from(join)),
        };
        if let Err(err) = outcome {
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => {
            metrics::counter!("mdsc_snapshots_written_total").increment(snapshots.len() as u64);
            Ok(snapshots.len())
        }
    }
}

/// Runs supervised batches against one set of adapters.
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    adapters: BatchAdapters,
    config: BatchConfig,
}

impl BatchOrchestrator {
    pub fn new(adapters: BatchAdapters, config: BatchConfig) -> Self {
        Self { adapters, config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// One unsupervised run with evaluation instant `now`.
    pub async fn run_once(&self, now: Timestamp) -> Result<BatchReport, BatchError> {
        let clock = ComplianceClock::new(now, self.config.timezone);
        let processor = ComplianceProcessor::new(clock).with_event_window(self.config.event_window);

        let store = Arc::clone(&self.adapters.policies);
        let policies = tokio::task::spawn_blocking(move || store.read_active_policies()).await??;
        let policies = select_policies(policies, now);
        let policies_evaluated = policies.len();
        if policies.is_empty() {
            tracing::info!(compliance_as_of = %now, "no active policies");
            return Ok(BatchReport {
                compliance_as_of: now,
                policies_evaluated,
                snapshots_written: 0,
                total_violations: 0,
            });
        }

        let store = Arc::clone(&self.adapters.geographies);
        let geographies =
            tokio::task::spawn_blocking(move || store.read_published_geographies()).await??;

        let gateway = Arc::clone(&self.adapters.gateway);
        let requested = policies.clone();
        let inputs =
            tokio::task::spawn_blocking(move || gather_inputs(gateway.as_ref(), &requested)).await??;

        let snapshots = compute_snapshots(policies, geographies, inputs, processor).await?;
        let mut total_violations: u64 = 0;
        for snapshot in &snapshots {
            total_violations += snapshot.total_violations;
            metrics::counter!(
                "mdsc_violations_total",
                "policy_id" => snapshot.policy.policy_id.to_string()
            )
            .increment(snapshot.total_violations);
        }

        let snapshots_written = submit_snapshots(
            Arc::clone(&self.adapters.sink),
            snapshots,
            self.config.batch_size,
        )
        .await?;

        Ok(BatchReport {
            compliance_as_of: now,
            policies_evaluated,
            snapshots_written,
            total_violations,
        })
    }

    /// A supervised run. Each attempt pins a fresh evaluation instant.
    pub async fn run(&self) -> Result<BatchReport, BatchError> {
        let started = Instant::now();
        let outcome = supervise(&self.config.retry, |attempt| {
            tracing::debug!(attempt = attempt + 1, "starting batch attempt");
            self.run_once(Timestamp::now())
        })
        .await;
        metrics::histogram!("mdsc_batch_duration_seconds").record(started.elapsed().as_secs_f64());

        match &outcome {
            Ok(report) => {
                metrics::counter!("mdsc_batch_runs_total", "outcome" => "success").increment(1);
                tracing::info!(
                    compliance_as_of = %report.compliance_as_of,
                    policies = report.policies_evaluated,
                    snapshots = report.snapshots_written,
                    total_violations = report.total_violations,
                    "batch run complete"
                );
            }
            Err(err) => {
                metrics::counter!("mdsc_batch_runs_total", "outcome" => "failure").increment(1);
                tracing::error!(error = %err, "batch run failed");
            }
        }
        outcome
    }
}
