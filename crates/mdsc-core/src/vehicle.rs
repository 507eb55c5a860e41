//! # Vehicles and Vehicle Events
//!
//! The read-only fleet inputs of an evaluation: registered devices and the
//! most recent event each device reported, with optional telemetry.

use serde::{Deserialize, Serialize};

use crate::identity::{DeviceId, ProviderId};
use crate::temporal::Timestamp;

/// Kind of vehicle a device is registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Bicycle,
    Bus,
    Car,
    CargoBicycle,
    Moped,
    Motorcycle,
    Scooter,
    Truck,
    Other,
}

/// Operational state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleState {
    Available,
    Elsewhere,
    NonOperational,
    OnTrip,
    Removed,
    Reserved,
    Unknown,
}

/// The event type(s) that moved a vehicle into its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    AgencyDropOff,
    AgencyPickUp,
    BatteryCharged,
    BatteryLow,
    CommsLost,
    CommsRestored,
    CompliancePickUp,
    Decommissioned,
    Located,
    Maintenance,
    MaintenanceEnd,
    MaintenancePickUp,
    MissingRecord,
    OffHours,
    OnHours,
    ProviderDropOff,
    RebalancePickUp,
    ReservationCancel,
    ReservationStart,
    SystemResume,
    SystemSuspend,
    TripCancel,
    TripEnd,
    TripEnterJurisdiction,
    TripLeaveJurisdiction,
    TripStart,
    Unspecified,
}

/// A registered vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub device_id: DeviceId,
    pub provider_id: ProviderId,
    pub vehicle_type: VehicleType,
}

/// A GPS fix. `speed` is metres per second when present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gps {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// Telemetry attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub gps: Gps,
    pub timestamp: Timestamp,
}

/// The most recent event reported for a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleEvent {
    pub device_id: DeviceId,
    pub provider_id: ProviderId,
    pub timestamp: Timestamp,
    pub event_types: Vec<EventType>,
    pub vehicle_state: VehicleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telemetry: Option<Telemetry>,
}
