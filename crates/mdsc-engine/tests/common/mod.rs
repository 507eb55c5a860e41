//! Shared fixtures: a fixed city boundary, fleets placed inside or outside
//! it, and policy builders.

#![allow(dead_code)]

use mdsc_core::geography::Geometry;
use mdsc_core::{
    CountRule, Device, DeviceId, EventType, Geography, GeographyId, GeographyShape, Gps, Policy,
    PolicyId, ProviderId, Rule, RuleId, RuleScope, SpeedRule, Telemetry, TimeRule, TimeUnits,
    Timestamp, VehicleEvent, VehicleState, VehicleType,
};
use mdsc_engine::{ComplianceClock, ProviderInputs};

/// 2025-06-15T15:06:40Z
pub const NOW: i64 = 1_750_000_000_000;

pub fn now() -> Timestamp {
    Timestamp::from_epoch_millis(NOW).unwrap()
}

pub fn clock() -> ComplianceClock {
    ComplianceClock::new(now(), chrono_tz::America::Los_Angeles)
}

/// A rectangle roughly covering central Los Angeles.
pub fn city() -> Geography {
    Geography {
        geography_id: GeographyId::new(),
        name: Some("Los Angeles".into()),
        publish_date: Some(Timestamp::from_epoch_millis(0).unwrap()),
        geography_json: GeographyShape::Geometry(Geometry::Polygon {
            coordinates: vec![vec![
                vec![-118.50, 33.90],
                vec![-118.10, 33.90],
                vec![-118.10, 34.20],
                vec![-118.50, 34.20],
                vec![-118.50, 33.90],
            ]],
        }),
    }
}

pub const INSIDE: (f64, f64) = (34.05, -118.25);
pub const OUTSIDE: (f64, f64) = (40.71, -74.00);

/// Builder for one provider's fleet.
pub struct Fleet {
    pub provider_id: ProviderId,
    pub inputs: ProviderInputs,
    seq: i64,
}

impl Fleet {
    pub fn new() -> Self {
        Self {
            provider_id: ProviderId::new(),
            inputs: ProviderInputs::default(),
            seq: 0,
        }
    }

    /// Add `n` available vehicles at `at`, each reporting `speed` m/s,
    /// last seen `age_minutes` (plus up to ten seconds) ago. Each successive
    /// vehicle is one millisecond newer than the previous one.
    pub fn add(
        &mut self,
        n: usize,
        at: (f64, f64),
        vehicle_type: VehicleType,
        speed: Option<f64>,
        age_minutes: i64,
    ) -> Vec<DeviceId> {
        let mut ids = Vec::with_capacity(n);
        for _ in 0..n {
            self.seq += 1;
            let device = Device {
                device_id: DeviceId::new(),
                provider_id: self.provider_id,
                vehicle_type,
            };
            let timestamp =
                Timestamp::from_epoch_millis(NOW - age_minutes * 60_000 - 10_000 + self.seq)
                    .unwrap();
            self.inputs.events.push(VehicleEvent {
                device_id: device.device_id,
                provider_id: self.provider_id,
                timestamp,
                event_types: vec![EventType::ProviderDropOff],
                vehicle_state: VehicleState::Available,
                telemetry: Some(Telemetry {
                    gps: Gps { lat: at.0, lng: at.1, speed },
                    timestamp,
                }),
            });
            ids.push(device.device_id);
            self.inputs.devices.push(device);
        }
        ids
    }
}

pub fn scope(geography: GeographyId) -> RuleScope {
    RuleScope {
        rule_id: RuleId::new(),
        name: "Greater LA".into(),
        geographies: vec![geography],
        states: None,
        vehicle_types: Some(vec![VehicleType::Bicycle, VehicleType::Scooter]),
        days: None,
        start_time: None,
        end_time: None,
    }
}

pub fn count_rule(geography: GeographyId, maximum: Option<u64>, minimum: Option<u64>) -> Rule {
    Rule::Count(CountRule { scope: scope(geography), maximum, minimum })
}

pub fn speed_rule(geography: GeographyId, maximum: f64) -> Rule {
    Rule::Speed(SpeedRule { scope: scope(geography), maximum: Some(maximum), rule_units: None })
}

pub fn time_rule(geography: GeographyId, maximum_minutes: f64) -> Rule {
    Rule::Time(TimeRule {
        scope: scope(geography),
        maximum: Some(maximum_minutes),
        rule_units: Some(TimeUnits::Minutes),
    })
}

pub fn policy(rules: Vec<Rule>) -> Policy {
    Policy {
        policy_id: PolicyId::new(),
        name: "LA fleet policy".into(),
        description: Some("fixture".into()),
        start_date: Timestamp::from_epoch_millis(0).unwrap(),
        end_date: None,
        publish_date: None,
        prev_policies: None,
        provider_ids: None,
        rules,
    }
}
