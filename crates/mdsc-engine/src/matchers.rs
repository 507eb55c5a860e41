//! # Rule Matchers
//!
//! Pure predicates deciding whether one device's current event matches one
//! rule. Every matcher first requires the shared scope to pass:
//!
//! - the rule is active at the evaluation instant,
//! - the event's state (and event type) is accepted by `states`,
//! - the device's vehicle type is accepted by `vehicle_types`,
//!
//! then applies its own predicate. Capacity accounting for count rules
//! lives in the processor, not here.
//!
//! For speed and time rules `maximum` is a violation threshold: a match
//! means the vehicle is at or over the limit.

use mdsc_core::{
    CountRule, Device, Point, Rule, RuleScope, SpeedRule, SpeedUnits, TimeRule, TimeUnits,
    VehicleEvent,
};

use crate::clock::ComplianceClock;
use crate::geofence::GeographyIndex;

/// Everything a matcher reads besides the rule, device and event.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'a> {
    pub clock: &'a ComplianceClock,
    pub geographies: &'a GeographyIndex<'a>,
}

/// State / event-type membership.
///
/// `states` absent accepts every state. Otherwise the event's state must be
/// a key; an empty event-type list under it accepts any event type, a
/// non-empty one must share at least one type with the event.
pub fn is_in_states_or_events(scope: &RuleScope, event: &VehicleEvent) -> bool {
    let Some(states) = &scope.states else {
        return true;
    };
    match states.get(&event.vehicle_state) {
        None => false,
        Some(event_types) if event_types.is_empty() => true,
        Some(event_types) => event.event_types.iter().any(|t| event_types.contains(t)),
    }
}

/// Vehicle-type membership. Absent or empty `vehicle_types` accepts all.
pub fn is_in_vehicle_types(scope: &RuleScope, device: &Device) -> bool {
    match scope.vehicle_types.as_deref() {
        None | Some([]) => true,
        Some(types) => types.contains(&device.vehicle_type),
    }
}

fn event_point(event: &VehicleEvent) -> Option<Point> {
    event
        .telemetry
        .as_ref()
        .map(|telemetry| Point::new(telemetry.gps.lat, telemetry.gps.lng))
}

fn is_in_scope(ctx: &MatchContext<'_>, scope: &RuleScope, device: &Device, event: &VehicleEvent) -> bool {
    ctx.clock.is_rule_active(scope)
        && is_in_states_or_events(scope, event)
        && is_in_vehicle_types(scope, device)
}

fn is_in_geographies(ctx: &MatchContext<'_>, scope: &RuleScope, event: &VehicleEvent) -> bool {
    event_point(event)
        .is_some_and(|point| ctx.geographies.point_in_any_geography(point, &scope.geographies))
}

/// Count rule match: in scope and inside a referenced geography.
pub fn is_count_rule_match(
    rule: &CountRule,
    ctx: &MatchContext<'_>,
    device: &Device,
    event: &VehicleEvent,
) -> bool {
    is_in_scope(ctx, &rule.scope, device, event) && is_in_geographies(ctx, &rule.scope, event)
}

/// Speed rule match: in scope, inside a geography, telemetry speed known,
/// and (no maximum, or speed in rule units `>=` maximum).
pub fn is_speed_rule_match(
    rule: &SpeedRule,
    ctx: &MatchContext<'_>,
    device: &Device,
    event: &VehicleEvent,
) -> bool {
    if !is_in_scope(ctx, &rule.scope, device, event) || !is_in_geographies(ctx, &rule.scope, event) {
        return false;
    }
    let Some(speed) = event.telemetry.as_ref().and_then(|t| t.gps.speed) else {
        return false;
    };
    let units = rule.rule_units.unwrap_or(SpeedUnits::Mps);
    rule.maximum
        .map_or(true, |maximum| units.from_metres_per_second(speed) >= maximum)
}

/// Time rule match: in scope, (no maximum, or dwell since the event in rule
/// units `>=` maximum), and inside a geography.
pub fn is_time_rule_match(
    rule: &TimeRule,
    ctx: &MatchContext<'_>,
    device: &Device,
    event: &VehicleEvent,
) -> bool {
    if !is_in_scope(ctx, &rule.scope, device, event) {
        return false;
    }
    let units = rule.rule_units.unwrap_or(TimeUnits::Minutes);
    let dwell = ctx.clock.now().since(event.timestamp).num_milliseconds() as f64
        / units.millis() as f64;
    rule.maximum.map_or(true, |maximum| dwell >= maximum) && is_in_geographies(ctx, &rule.scope, event)
}

/// Dispatch to the matcher for the rule's type.
pub fn is_rule_match(rule: &Rule, ctx: &MatchContext<'_>, device: &Device, event: &VehicleEvent) -> bool {
    match rule {
        Rule::Count(rule) => is_count_rule_match(rule, ctx, device, event),
        Rule::Speed(rule) => is_speed_rule_match(rule, ctx, device, event),
        Rule::Time(rule) => is_time_rule_match(rule, ctx, device, event),
    }
}
