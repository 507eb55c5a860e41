//! # Compliance Processor
//!
//! Evaluates one policy against one provider's fleet and produces a
//! [`ComplianceEngineResult`]. Dispatch is an exhaustive match on
//! [`RuleType`]; a processor handed a rule of another type refuses with
//! [`EngineError::UnsupportedRuleType`].
//!
//! ## Count Rules: Claim and Overflow
//!
//! Rules are visited in policy order against a per-evaluation working set
//! of devices. For each rule, events are visited oldest first; each match
//! counts against the rule's `maximum`:
//!
//! - within capacity, the device is **claimed**: `rule_applied` is set, it
//!   leaves the working set and, if an earlier rule overflowed it, the
//!   overflow set;
//! - beyond capacity, the device **overflows**: it stays in the working set
//!   so a later rule may still claim it.
//!
//! After each rule, a shortfall against `minimum` adds
//! `minimum - matches` violations. Finally
//! `excess_vehicles_count = |overflow|` and
//! `total_violations = minimum shortfall + excess`.
//!
//! ## Speed and Time Rules
//!
//! The first rule (in policy order) a device matches claims it. There is no
//! capacity; `total_violations` is the number of claimed devices.
//!
//! ## Annotation
//!
//! A second, order-independent pass re-checks every rule against every
//! vehicle already found and records each rule it matches in
//! `rules_matched`. It never changes membership or `rule_applied`.
//!
//! The working set is owned by a single evaluation and is never shared;
//! evaluations of different providers or policies may run in parallel.

use std::collections::{HashMap, HashSet};

use chrono::Duration;

use mdsc_core::{
    ComplianceEngineResult, CountRule, Device, DeviceId, Geography, MatchedGps,
    MatchedVehicleInformation, Policy, Rule, RuleId, RuleType, SpeedRule, TimeRule,
    VehicleEvent,
};

use crate::clock::ComplianceClock;
use crate::error::EngineError;
use crate::geofence::GeographyIndex;
use crate::inputs::{EvaluationInputs, ProviderInputs, DEFAULT_EVENT_WINDOW_HOURS};
use crate::matchers::{
    is_count_rule_match, is_rule_match, is_speed_rule_match, is_time_rule_match, MatchContext,
};

/// Per-policy evaluator bound to one clock.
#[derive(Debug, Clone, Copy)]
pub struct ComplianceProcessor {
    clock: ComplianceClock,
    event_window: Duration,
}

impl ComplianceProcessor {
    /// A processor using the default 48 hour event window.
    pub fn new(clock: ComplianceClock) -> Self {
        Self {
            clock,
            event_window: Duration::hours(DEFAULT_EVENT_WINDOW_HOURS),
        }
    }

    /// Override the event recency window.
    pub fn with_event_window(mut self, window: Duration) -> Self {
        self.event_window = window;
        self
    }

    /// The clock this processor evaluates against.
    pub fn clock(&self) -> &ComplianceClock {
        &self.clock
    }

    /// Evaluate `policy` with the processor matching its rule type.
    pub fn process_policy(
        &self,
        policy: &Policy,
        geographies: &[Geography],
        inputs: &ProviderInputs,
    ) -> Result<ComplianceEngineResult, EngineError> {
        let rule_type = policy
            .rule_type()?
            .ok_or(EngineError::EmptyPolicy(policy.policy_id))?;
        match rule_type {
            RuleType::Count => self.process_count_policy(policy, geographies, inputs),
            RuleType::Speed => self.process_speed_policy(policy, geographies, inputs),
            RuleType::Time => self.process_time_policy(policy, geographies, inputs),
        }
    }

    /// Evaluate a count policy with the claim/overflow algorithm.
    pub fn process_count_policy(
        &self,
        policy: &Policy,
        geographies: &[Geography],
        inputs: &ProviderInputs,
    ) -> Result<ComplianceEngineResult, EngineError> {
        let rules = typed_rules(policy, RuleType::Count, |rule| match rule {
            Rule::Count(rule) => Some(rule),
            _ => None,
        })?;
        let index = self.index_geographies(policy, geographies);
        let inputs = EvaluationInputs::prepare(inputs, self.clock.now(), self.event_window);
        let ctx = MatchContext {
            clock: &self.clock,
            geographies: &index,
        };

        let mut working_set: HashSet<DeviceId> = inputs.device_ids().collect();
        let mut claimed: Vec<MatchedVehicleInformation> = Vec::new();
        let mut overflowed: HashMap<DeviceId, MatchedVehicleInformation> = HashMap::new();
        let mut minimum_violations: u64 = 0;

        for rule in rules {
            let rule_id = rule.scope.rule_id;
            let maximum = rule.maximum.unwrap_or(u64::MAX);
            let mut num_matches: u64 = 0;

            for (device, event) in candidates(&inputs, &working_set) {
                if !working_set.contains(&device.device_id) {
                    continue;
                }
                if !is_count_rule_match(rule, &ctx, device, event) {
                    continue;
                }
                if num_matches < maximum {
                    working_set.remove(&device.device_id);
                    overflowed.remove(&device.device_id);
                    claimed.push(matched_vehicle(event, rule_id, true));
                } else if let Some(vehicle) = overflowed.get_mut(&device.device_id) {
                    vehicle.note_rule_matched(rule_id);
                } else {
                    overflowed.insert(device.device_id, matched_vehicle(event, rule_id, false));
                }
                num_matches += 1;
            }

            if let Some(minimum) = rule.minimum {
                minimum_violations += minimum.saturating_sub(num_matches);
            }
            tracing::debug!(
                policy_id = %policy.policy_id,
                rule_id = %rule_id,
                num_matches,
                overflowed = overflowed.len(),
                "count rule evaluated"
            );
        }

        let excess_vehicles_count = overflowed.len() as u64;
        let mut overflow: Vec<MatchedVehicleInformation> = overflowed.into_values().collect();
        overflow.sort_by_key(|vehicle| (vehicle.timestamp, vehicle.device_id));

        let mut vehicles_found = claimed;
        vehicles_found.extend(overflow);
        annotate(policy, &ctx, &inputs, &mut vehicles_found);

        Ok(ComplianceEngineResult {
            vehicles_found,
            excess_vehicles_count,
            total_violations: minimum_violations + excess_vehicles_count,
        })
    }

    /// Evaluate a speed policy.
    pub fn process_speed_policy(
        &self,
        policy: &Policy,
        geographies: &[Geography],
        inputs: &ProviderInputs,
    ) -> Result<ComplianceEngineResult, EngineError> {
        let rules = typed_rules(policy, RuleType::Speed, |rule| match rule {
            Rule::Speed(rule) => Some(rule),
            _ => None,
        })?;
        Ok(self.process_first_match(policy, geographies, inputs, &rules, |rule: &SpeedRule, ctx, device, event| {
            is_speed_rule_match(rule, ctx, device, event).then_some(rule.scope.rule_id)
        }))
    }

    /// Evaluate a time policy.
    pub fn process_time_policy(
        &self,
        policy: &Policy,
        geographies: &[Geography],
        inputs: &ProviderInputs,
    ) -> Result<ComplianceEngineResult, EngineError> {
        let rules = typed_rules(policy, RuleType::Time, |rule| match rule {
            Rule::Time(rule) => Some(rule),
            _ => None,
        })?;
        Ok(self.process_first_match(policy, geographies, inputs, &rules, |rule: &TimeRule, ctx, device, event| {
            is_time_rule_match(rule, ctx, device, event).then_some(rule.scope.rule_id)
        }))
    }

    /// First-match claiming shared by speed and time rules.
    fn process_first_match<R, F>(
        &self,
        policy: &Policy,
        geographies: &[Geography],
        inputs: &ProviderInputs,
        rules: &[&R],
        matches: F,
    ) -> ComplianceEngineResult
    where
        F: Fn(&R, &MatchContext<'_>, &Device, &VehicleEvent) -> Option<RuleId>,
    {
        let index = self.index_geographies(policy, geographies);
        let inputs = EvaluationInputs::prepare(inputs, self.clock.now(), self.event_window);
        let ctx = MatchContext {
            clock: &self.clock,
            geographies: &index,
        };

        let mut working_set: HashSet<DeviceId> = inputs.device_ids().collect();
        let mut claimed: Vec<MatchedVehicleInformation> = Vec::new();

        for rule in rules {
            for (device, event) in candidates(&inputs, &working_set) {
                if !working_set.contains(&device.device_id) {
                    continue;
                }
                if let Some(rule_id) = matches(*rule, &ctx, device, event) {
                    working_set.remove(&device.device_id);
                    claimed.push(matched_vehicle(event, rule_id, true));
                }
            }
        }

        annotate(policy, &ctx, &inputs, &mut claimed);
        let total_violations = claimed.len() as u64;
        ComplianceEngineResult {
            vehicles_found: claimed,
            excess_vehicles_count: 0,
            total_violations,
        }
    }

    fn index_geographies<'g>(&self, policy: &Policy, geographies: &'g [Geography]) -> GeographyIndex<'g> {
        let index = GeographyIndex::new(geographies);
        for rule in &policy.rules {
            for geography_id in rule.scope().geographies.iter().filter(|id| !index.contains_id(id)) {
                tracing::warn!(
                    policy_id = %policy.policy_id,
                    rule_id = %rule.rule_id(),
                    geography_id = %geography_id,
                    "rule references an unpublished geography; it contains no vehicles"
                );
            }
        }
        index
    }
}

/// Second pass: record every rule each found vehicle matches, in policy order.
pub fn annotate(
    policy: &Policy,
    ctx: &MatchContext<'_>,
    inputs: &EvaluationInputs<'_>,
    vehicles: &mut [MatchedVehicleInformation],
) {
    for vehicle in vehicles.iter_mut() {
        let (Some(device), Some(event)) =
            (inputs.device(&vehicle.device_id), inputs.event(&vehicle.device_id))
        else {
            continue;
        };
        let mut rules_matched: Vec<RuleId> = policy
            .rules
            .iter()
            .filter(|rule| is_rule_match(rule, ctx, device, event))
            .map(Rule::rule_id)
            .collect();
        for rule_id in &vehicle.rules_matched {
            if !rules_matched.contains(rule_id) {
                rules_matched.push(*rule_id);
            }
        }
        vehicle.rules_matched = rules_matched;
    }
}

/// Collect the policy's rules as `T`, failing on the first rule of another type.
fn typed_rules<'p, T>(
    policy: &'p Policy,
    expected: RuleType,
    select: impl Fn(&'p Rule) -> Option<&'p T>,
) -> Result<Vec<&'p T>, EngineError> {
    policy
        .rules
        .iter()
        .map(|rule| {
            select(rule).ok_or(EngineError::UnsupportedRuleType {
                policy_id: policy.policy_id,
                expected,
                found: rule.rule_type(),
            })
        })
        .collect()
}

/// Events (oldest first) whose device is still unclaimed, paired with the device.
///
/// Collected eagerly so the caller may mutate the working set while iterating.
fn candidates<'a>(
    inputs: &EvaluationInputs<'a>,
    working_set: &HashSet<DeviceId>,
) -> Vec<(&'a Device, &'a VehicleEvent)> {
    inputs
        .events()
        .iter()
        .filter(|event| working_set.contains(&event.device_id))
        .filter_map(|event| inputs.device(&event.device_id).map(|device| (device, *event)))
        .collect()
}

fn matched_vehicle(event: &VehicleEvent, rule_id: RuleId, claimed: bool) -> MatchedVehicleInformation {
    let gps = event.telemetry.as_ref().map(|t| t.gps);
    MatchedVehicleInformation {
        device_id: event.device_id,
        state: event.vehicle_state,
        event_types: event.event_types.clone(),
        timestamp: event.timestamp,
        gps: MatchedGps {
            lat: gps.map_or(0.0, |g| g.lat),
            lng: gps.map_or(0.0, |g| g.lng),
        },
        speed: gps.and_then(|g| g.speed),
        rule_applied: claimed.then_some(rule_id),
        rules_matched: vec![rule_id],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdsc_core::geography::Geometry;
    use mdsc_core::{
        GeographyId, GeographyShape, Gps, PolicyId, ProviderId, RuleScope, Telemetry, Timestamp,
        VehicleState, VehicleType,
    };

    const NOW: i64 = 1_750_000_000_000;

    fn processor() -> ComplianceProcessor {
        ComplianceProcessor::new(ComplianceClock::new(
            Timestamp::from_epoch_millis(NOW).unwrap(),
            chrono_tz::UTC,
        ))
    }

    fn square(id: GeographyId, min: f64, max: f64) -> Geography {
        Geography {
            geography_id: id,
            name: None,
            publish_date: None,
            geography_json: GeographyShape::Geometry(Geometry::Polygon {
                coordinates: vec![vec![
                    vec![min, min],
                    vec![max, min],
                    vec![max, max],
                    vec![min, max],
                    vec![min, min],
                ]],
            }),
        }
    }

    fn scope(geography: GeographyId) -> RuleScope {
        RuleScope {
            rule_id: RuleId::new(),
            name: "rule".into(),
            geographies: vec![geography],
            states: None,
            vehicle_types: None,
            days: None,
            start_time: None,
            end_time: None,
        }
    }

    fn count(geography: GeographyId, maximum: Option<u64>, minimum: Option<u64>) -> Rule {
        Rule::Count(CountRule { scope: scope(geography), maximum, minimum })
    }

    fn policy(rules: Vec<Rule>) -> Policy {
        Policy {
            policy_id: PolicyId::new(),
            name: "policy".into(),
            description: None,
            start_date: Timestamp::from_epoch_millis(0).unwrap(),
            end_date: None,
            publish_date: None,
            prev_policies: None,
            provider_ids: None,
            rules,
        }
    }

    /// One vehicle per `(lat/lng, age_seconds)` pair; older vehicles first in time.
    fn fleet(points: &[(f64, i64)]) -> ProviderInputs {
        let provider = ProviderId::new();
        let mut inputs = ProviderInputs::default();
        for (coord, age_seconds) in points {
            let device = Device {
                device_id: DeviceId::new(),
                provider_id: provider,
                vehicle_type: VehicleType::Scooter,
            };
            let timestamp = Timestamp::from_epoch_millis(NOW - age_seconds * 1_000).unwrap();
            inputs.events.push(VehicleEvent {
                device_id: device.device_id,
                provider_id: provider,
                timestamp,
                event_types: vec![mdsc_core::EventType::ProviderDropOff],
                vehicle_state: VehicleState::Available,
                telemetry: Some(Telemetry {
                    gps: Gps { lat: *coord, lng: *coord, speed: Some(1.0) },
                    timestamp,
                }),
            });
            inputs.devices.push(device);
        }
        inputs
    }

    #[test]
    fn earliest_reporters_claim_capacity() {
        let g = GeographyId::new();
        let geographies = vec![square(g, 0.0, 10.0)];
        let p = policy(vec![count(g, Some(1), None)]);
        // Second vehicle reported earlier than the first.
        let inputs = fleet(&[(5.0, 10), (5.0, 20)]);
        let early = inputs.events[1].device_id;

        let result = processor().process_count_policy(&p, &geographies, &inputs).unwrap();
        assert_eq!(result.excess_vehicles_count, 1);
        assert_eq!(result.total_violations, 1);
        let winner = result.vehicles_found.iter().find(|v| v.rule_applied.is_some()).unwrap();
        assert_eq!(winner.device_id, early);
    }

    #[test]
    fn overflow_rescued_by_later_rule() {
        let g = GeographyId::new();
        let geographies = vec![square(g, 0.0, 10.0)];
        let first = count(g, Some(1), None);
        let second = count(g, Some(5), None);
        let (first_id, second_id) = (first.rule_id(), second.rule_id());
        let p = policy(vec![first, second]);
        let inputs = fleet(&[(5.0, 30), (5.0, 20)]);
        let late = inputs.events[1].device_id;

        let result = processor().process_count_policy(&p, &geographies, &inputs).unwrap();
        assert_eq!(result.excess_vehicles_count, 0);
        assert_eq!(result.total_violations, 0);
        assert_eq!(result.vehicles_found.len(), 2);
        let rescued = result.vehicles_found.iter().find(|v| v.device_id == late).unwrap();
        assert_eq!(rescued.rule_applied, Some(second_id));
        assert_eq!(rescued.rules_matched, vec![first_id, second_id]);
    }

    #[test]
    fn overflow_accumulates_rules_matched() {
        let g = GeographyId::new();
        let geographies = vec![square(g, 0.0, 10.0)];
        let first = count(g, Some(0), None);
        let second = count(g, Some(0), None);
        let ids = vec![first.rule_id(), second.rule_id()];
        let p = policy(vec![first, second]);
        let inputs = fleet(&[(5.0, 30)]);

        let result = processor().process_count_policy(&p, &geographies, &inputs).unwrap();
        assert_eq!(result.excess_vehicles_count, 1);
        assert_eq!(result.vehicles_found[0].rule_applied, None);
        assert_eq!(result.vehicles_found[0].rules_matched, ids);
    }

    #[test]
    fn minimum_shortfall_adds_to_excess() {
        let inside = GeographyId::new();
        let elsewhere = GeographyId::new();
        let geographies = vec![square(inside, 0.0, 10.0), square(elsewhere, 20.0, 30.0)];
        let capped = count(inside, Some(1), None);
        let quota = count(elsewhere, None, Some(4));
        let p = policy(vec![capped, quota]);
        let inputs = fleet(&[(5.0, 30), (5.0, 20), (25.0, 10)]);

        let result = processor().process_count_policy(&p, &geographies, &inputs).unwrap();
        assert_eq!(result.excess_vehicles_count, 1);
        assert_eq!(result.total_violations, 1 + 3);
        assert_eq!(result.vehicles_found.len(), 3);
    }

    #[test]
    fn annotation_adds_all_matching_rules_for_claimed_vehicle() {
        let g = GeographyId::new();
        let geographies = vec![square(g, 0.0, 10.0)];
        let first = count(g, None, None);
        let second = count(g, None, None);
        let ids = vec![first.rule_id(), second.rule_id()];
        let p = policy(vec![first, second]);
        let inputs = fleet(&[(5.0, 30)]);

        let result = processor().process_count_policy(&p, &geographies, &inputs).unwrap();
        let vehicle = &result.vehicles_found[0];
        assert_eq!(vehicle.rule_applied, Some(ids[0]));
        assert_eq!(vehicle.rules_matched, ids);
    }

    #[test]
    fn speed_first_rule_claims() {
        let g = GeographyId::new();
        let geographies = vec![square(g, 0.0, 10.0)];
        let slow = Rule::Speed(SpeedRule { scope: scope(g), maximum: Some(0.5), rule_units: None });
        let fast = Rule::Speed(SpeedRule { scope: scope(g), maximum: Some(0.1), rule_units: None });
        let ids = vec![slow.rule_id(), fast.rule_id()];
        let p = policy(vec![slow, fast]);
        let inputs = fleet(&[(5.0, 30), (50.0, 30)]);

        let result = processor().process_policy(&p, &geographies, &inputs).unwrap();
        assert_eq!(result.total_violations, 1);
        assert_eq!(result.excess_vehicles_count, 0);
        assert_eq!(result.vehicles_found[0].rule_applied, Some(ids[0]));
        assert_eq!(result.vehicles_found[0].rules_matched, ids);
        assert_eq!(result.vehicles_found[0].speed, Some(1.0));
    }

    #[test]
    fn processor_rejects_foreign_rule_type() {
        let g = GeographyId::new();
        let p = policy(vec![Rule::Time(TimeRule { scope: scope(g), maximum: None, rule_units: None })]);
        let err = processor()
            .process_count_policy(&p, &[], &ProviderInputs::default())
            .unwrap_err();
        match err {
            EngineError::UnsupportedRuleType { expected, found, .. } => {
                assert_eq!(expected, RuleType::Count);
                assert_eq!(found, RuleType::Time);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dispatch_rejects_empty_and_mixed_policies() {
        let g = GeographyId::new();
        let empty = policy(Vec::new());
        assert!(matches!(
            processor().process_policy(&empty, &[], &ProviderInputs::default()),
            Err(EngineError::EmptyPolicy(_))
        ));

        let mixed = policy(vec![
            count(g, None, None),
            Rule::Speed(SpeedRule { scope: scope(g), maximum: None, rule_units: None }),
        ]);
        assert!(matches!(
            processor().process_policy(&mixed, &[], &ProviderInputs::default()),
            Err(EngineError::Model(_))
        ));
    }

    /// Give the first vehicle an extra, older report.
    fn with_repeat_report(mut inputs: ProviderInputs, age_seconds: i64) -> ProviderInputs {
        let mut repeat = inputs.events[0].clone();
        repeat.timestamp = Timestamp::from_epoch_millis(NOW - age_seconds * 1_000).unwrap();
        inputs.events.push(repeat);
        inputs
    }

    #[test]
    fn repeated_reports_claim_capacity_once() {
        let g = GeographyId::new();
        let geographies = vec![square(g, 0.0, 10.0)];
        let inputs = with_repeat_report(fleet(&[(5.0, 10), (5.0, 20)]), 30);
        let (repeated, other) = (inputs.events[0].device_id, inputs.events[1].device_id);

        let p = policy(vec![count(g, Some(10), None)]);
        let result = processor().process_count_policy(&p, &geographies, &inputs).unwrap();
        assert_eq!(result.vehicles_found.len(), 2);
        assert_eq!(result.total_violations, 0);

        // The newest report decides the order: `other` reported earlier.
        let p = policy(vec![count(g, Some(1), None)]);
        let result = processor().process_count_policy(&p, &geographies, &inputs).unwrap();
        assert_eq!(result.vehicles_found.len(), 2);
        assert_eq!(result.excess_vehicles_count, 1);
        let winner = result.vehicles_found.iter().find(|v| v.rule_applied.is_some()).unwrap();
        assert_eq!(winner.device_id, other);
        let overflow = result.vehicles_found.iter().find(|v| v.rule_applied.is_none()).unwrap();
        assert_eq!(overflow.device_id, repeated);
    }

    #[test]
    fn repeated_reports_count_once_for_speed() {
        let g = GeographyId::new();
        let geographies = vec![square(g, 0.0, 10.0)];
        let inputs = with_repeat_report(fleet(&[(5.0, 10)]), 30);
        let p = policy(vec![Rule::Speed(SpeedRule {
            scope: scope(g),
            maximum: Some(0.5),
            rule_units: None,
        })]);
        let result = processor().process_speed_policy(&p, &geographies, &inputs).unwrap();
        assert_eq!(result.vehicles_found.len(), 1);
        assert_eq!(result.total_violations, 1);
    }

    #[test]
    fn stale_events_are_ignored() {
        let g = GeographyId::new();
        let geographies = vec![square(g, 0.0, 10.0)];
        let p = policy(vec![count(g, Some(0), None)]);
        let inputs = fleet(&[(5.0, 49 * 3_600)]);
        let result = processor().process_count_policy(&p, &geographies, &inputs).unwrap();
        assert!(result.vehicles_found.is_empty());

        let widened = processor().with_event_window(Duration::hours(72));
        let result = widened.process_count_policy(&p, &geographies, &inputs).unwrap();
        assert_eq!(result.excess_vehicles_count, 1);
    }
}
