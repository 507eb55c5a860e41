//! # Evaluation Inputs
//!
//! A provider's fleet inputs and the filtering step that runs before any
//! matcher sees an event: only events carrying telemetry and newer than the
//! recency window survive, ordered oldest first. The ordering is what makes
//! capacity assignment deterministic: earlier reporters claim capacity
//! before later ones.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use mdsc_core::{Device, DeviceId, ProviderId, Timestamp, VehicleEvent};

/// Default recency window for events, in hours.
pub const DEFAULT_EVENT_WINDOW_HOURS: i64 = 48;

/// Devices and their latest events, as supplied by the device/event gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderInputs {
    pub devices: Vec<Device>,
    pub events: Vec<VehicleEvent>,
}

impl ProviderInputs {
    /// Split a fleet-wide input set by provider.
    ///
    /// Devices are keyed by their own `provider_id`, events by theirs.
    pub fn partition_by_provider(self) -> HashMap<ProviderId, ProviderInputs> {
        let mut out: HashMap<ProviderId, ProviderInputs> = HashMap::new();
        for device in self.devices {
            out.entry(device.provider_id).or_default().devices.push(device);
        }
        for event in self.events {
            out.entry(event.provider_id).or_default().events.push(event);
        }
        out
    }

    /// Append another input set.
    pub fn extend(&mut self, other: ProviderInputs) {
        self.devices.extend(other.devices);
        self.events.extend(other.events);
    }
}

/// Keep events with telemetry newer than `now - window`, oldest first.
///
/// Ties on timestamp are broken by device id so the order is total.
pub fn filter_events(events: &[VehicleEvent], now: Timestamp, window: Duration) -> Vec<&VehicleEvent> {
    let cutoff = now.saturating_sub(window);
    let mut kept: Vec<&VehicleEvent> = events
        .iter()
        .filter(|event| event.telemetry.is_some() && event.timestamp > cutoff)
        .collect();
    kept.sort_by_key(|event| (event.timestamp, event.device_id));
    kept
}

/// Filtered, ordered, indexed inputs for one policy × provider evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationInputs<'a> {
    events: Vec<&'a VehicleEvent>,
    events_by_device: HashMap<DeviceId, &'a VehicleEvent>,
    devices: HashMap<DeviceId, &'a Device>,
}

impl<'a> EvaluationInputs<'a> {
    /// Filter and index raw provider inputs.
    ///
    /// A device reported more than once keeps only its newest surviving
    /// event, so it enters an evaluation at most once.
    pub fn prepare(inputs: &'a ProviderInputs, now: Timestamp, window: Duration) -> Self {
        let devices: HashMap<DeviceId, &'a Device> =
            inputs.devices.iter().map(|d| (d.device_id, d)).collect();
        let mut events = filter_events(&inputs.events, now, window);
        // Oldest first, so the last insert per device is its newest event.
        let events_by_device: HashMap<DeviceId, &'a VehicleEvent> =
            events.iter().map(|e| (e.device_id, *e)).collect();
        events.retain(|event| {
            events_by_device
                .get(&event.device_id)
                .is_some_and(|latest| std::ptr::eq(*latest, *event))
        });
        Self {
            events,
            events_by_device,
            devices,
        }
    }

    /// Surviving events, oldest first.
    pub fn events(&self) -> &[&'a VehicleEvent] {
        &self.events
    }

    /// The device registered under `id`.
    pub fn device(&self, id: &DeviceId) -> Option<&'a Device> {
        self.devices.get(id).copied()
    }

    /// The surviving event for `id`.
    pub fn event(&self, id: &DeviceId) -> Option<&'a VehicleEvent> {
        self.events_by_device.get(id).copied()
    }

    /// Devices referenced by a surviving event that are also registered.
    /// This is the initial working set of an evaluation.
    pub fn device_ids(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.events
            .iter()
            .map(|event| event.device_id)
            .filter(|id| self.devices.contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdsc_core::{EventType, Gps, Telemetry, VehicleState, VehicleType};

    const HOUR: i64 = 3_600_000;
    const NOW: i64 = 1_750_000_000_000;

    fn now() -> Timestamp {
        Timestamp::from_epoch_millis(NOW).unwrap()
    }

    fn event(provider: ProviderId, age_ms: i64, with_telemetry: bool) -> VehicleEvent {
        let timestamp = Timestamp::from_epoch_millis(NOW - age_ms).unwrap();
        VehicleEvent {
            device_id: DeviceId::new(),
            provider_id: provider,
            timestamp,
            event_types: vec![EventType::Located],
            vehicle_state: VehicleState::Available,
            telemetry: with_telemetry.then_some(Telemetry {
                gps: Gps { lat: 0.0, lng: 0.0, speed: None },
                timestamp,
            }),
        }
    }

    #[test]
    fn filter_drops_stale_and_telemetry_less_events() {
        let p = ProviderId::new();
        let events = vec![
            event(p, HOUR, true),
            event(p, HOUR, false),
            event(p, 49 * HOUR, true),
            event(p, 48 * HOUR, true),
        ];
        let kept = filter_events(&events, now(), Duration::hours(48));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].device_id, events[0].device_id);
    }

    #[test]
    fn filter_orders_oldest_first() {
        let p = ProviderId::new();
        let events = vec![event(p, HOUR, true), event(p, 3 * HOUR, true), event(p, 2 * HOUR, true)];
        let kept = filter_events(&events, now(), Duration::hours(48));
        let ages: Vec<i64> = kept.iter().map(|e| NOW - e.timestamp.epoch_millis()).collect();
        assert_eq!(ages, vec![3 * HOUR, 2 * HOUR, HOUR]);
    }

    #[test]
    fn working_set_requires_registered_device() {
        let p = ProviderId::new();
        let registered = event(p, HOUR, true);
        let orphan = event(p, HOUR, true);
        let inputs = ProviderInputs {
            devices: vec![Device {
                device_id: registered.device_id,
                provider_id: p,
                vehicle_type: VehicleType::Scooter,
            }],
            events: vec![registered.clone(), orphan],
        };
        let prepared = EvaluationInputs::prepare(&inputs, now(), Duration::hours(48));
        assert_eq!(prepared.events().len(), 2);
        assert_eq!(prepared.device_ids().collect::<Vec<_>>(), vec![registered.device_id]);
        assert!(prepared.event(&registered.device_id).is_some());
    }

    #[test]
    fn repeated_device_keeps_newest_event() {
        let p = ProviderId::new();
        let older = event(p, 2 * HOUR, true);
        let mut newer = event(p, HOUR, true);
        newer.device_id = older.device_id;
        let other = event(p, 90 * 60_000, true);
        let inputs = ProviderInputs {
            devices: vec![Device {
                device_id: older.device_id,
                provider_id: p,
                vehicle_type: VehicleType::Scooter,
            }],
            events: vec![newer.clone(), other.clone(), older],
        };
        let prepared = EvaluationInputs::prepare(&inputs, now(), Duration::hours(48));
        let ids: Vec<DeviceId> = prepared.events().iter().map(|e| e.device_id).collect();
        assert_eq!(ids, vec![other.device_id, newer.device_id]);
        assert_eq!(prepared.event(&newer.device_id).map(|e| e.timestamp), Some(newer.timestamp));
        assert_eq!(prepared.device_ids().count(), 1);
    }

    #[test]
    fn partition_by_provider_splits_devices_and_events() {
        let (a, b) = (ProviderId::new(), ProviderId::new());
        let e1 = event(a, HOUR, true);
        let e2 = event(b, HOUR, true);
        let inputs = ProviderInputs {
            devices: vec![Device {
                device_id: e1.device_id,
                provider_id: a,
                vehicle_type: VehicleType::Bicycle,
            }],
            events: vec![e1, e2],
        };
        let parts = inputs.partition_by_provider();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[&a].devices.len(), 1);
        assert_eq!(parts[&a].events.len(), 1);
        assert!(parts[&b].devices.is_empty());
        assert_eq!(parts[&b].events.len(), 1);
    }
}
