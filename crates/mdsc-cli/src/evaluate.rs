//! # Offline Evaluation
//!
//! `mdsc evaluate` loads geographies, devices, events and policies from
//! JSON files, evaluates the policies for one provider and prints one
//! result per policy to stdout as JSON.
//!
//! Policies are evaluated as given: no supersession or date-range
//! filtering is applied, so a single historical policy can be replayed.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::Serialize;

use mdsc_batch::fixture::{read_json_file, read_policies_file};
use mdsc_batch::{DeviceEventGateway, FixtureStore};
use mdsc_core::{ComplianceEngineResult, Device, Geography, PolicyId, ProviderId, VehicleEvent};
use mdsc_engine::{parse_timezone, ComplianceClock, ComplianceProcessor};

/// Arguments for `mdsc evaluate`.
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// JSON array of published geographies.
    #[arg(long)]
    pub geographies: PathBuf,

    /// JSON array of devices.
    #[arg(long)]
    pub devices: PathBuf,

    /// JSON array of vehicle events.
    #[arg(long)]
    pub events: PathBuf,

    /// JSON array of policies.
    #[arg(long)]
    pub policies: PathBuf,

    /// Provider whose fleet is evaluated.
    #[arg(long)]
    pub provider_id: ProviderId,

    /// Evaluate only this policy.
    #[arg(long)]
    pub policy_id: Option<PolicyId>,

    /// Evaluation instant, RFC 3339 or epoch milliseconds. Defaults to now.
    #[arg(long)]
    pub now: Option<String>,

    /// IANA timezone for rule activity windows. Defaults to `$TIMEZONE`.
    #[arg(long)]
    pub timezone: Option<String>,
}

/// One line of `mdsc evaluate` output.
#[derive(Debug, Serialize)]
pub struct PolicyEvaluation {
    pub policy_id: PolicyId,
    pub policy_name: String,
    pub provider_id: ProviderId,
    pub result: ComplianceEngineResult,
}

/// Load the input files and evaluate.
pub fn evaluate(args: &EvaluateArgs) -> Result<Vec<PolicyEvaluation>> {
    let timezone_name = args.timezone.clone().or_else(|| std::env::var("TIMEZONE").ok());
    let timezone = parse_timezone(timezone_name.as_deref())?;
    let now = match &args.now {
        Some(raw) => crate::parse_instant(raw)?,
        None => mdsc_core::Timestamp::now(),
    };

    let geographies: Vec<Geography> = read_json_file(&args.geographies)?;
    let devices: Vec<Device> = read_json_file(&args.devices)?;
    let events: Vec<VehicleEvent> = read_json_file(&args.events)?;
    let mut policies = read_policies_file(&args.policies)?;
    if let Some(policy_id) = args.policy_id {
        policies.retain(|policy| policy.policy_id == policy_id);
        if policies.is_empty() {
            bail!("policy {policy_id} not found in {}", args.policies.display());
        }
    }

    let store = FixtureStore::new(Vec::new(), Vec::new(), devices, events);
    let inputs = store.get_inputs(Some(&args.provider_id))?;
    tracing::info!(
        provider_id = %args.provider_id,
        devices = inputs.devices.len(),
        events = inputs.events.len(),
        policies = policies.len(),
        compliance_as_of = %now,
        "evaluating"
    );

    let processor = ComplianceProcessor::new(ComplianceClock::new(now, timezone));
    policies
        .iter()
        .map(|policy| {
            let result = processor
                .process_policy(policy, &geographies, &inputs)
                .with_context(|| format!("evaluating policy {}", policy.policy_id))?;
            Ok(PolicyEvaluation {
                policy_id: policy.policy_id,
                policy_name: policy.name.clone(),
                provider_id: args.provider_id,
                result,
            })
        })
        .collect()
}

/// Execute `mdsc evaluate`.
pub fn run_evaluate(args: &EvaluateArgs) -> Result<u8> {
    let evaluations = evaluate(args)?;
    let json = serde_json::to_string_pretty(&evaluations).context("serializing results")?;
    println!("{json}");
    Ok(0)
}
