//! # File and In-Memory Adapters
//!
//! [`FixtureStore`] serves policies, geographies, devices and events from
//! memory, optionally loaded from a directory of JSON documents:
//!
//! ```text
//! <dir>/geographies.json   [Geography, ...]
//! <dir>/policies.json      [Policy, ...]
//! <dir>/devices.json       [Device, ...]
//! <dir>/events.json        [VehicleEvent, ...]
//! ```
//!
//! [`MemorySnapshotSink`] collects submitted snapshots; [`JsonLinesSink`]
//! appends them to a file, one JSON document per line.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;

use mdsc_core::{
    decode_policies, ComplianceSnapshot, Device, DeviceId, Geography, MdscError, Policy, ProviderId,
    VehicleEvent,
};
use mdsc_engine::ProviderInputs;

use crate::adapter::{
    AdapterError, ComplianceSnapshotSink, DeviceEventGateway, GeographyStore, PolicyStore,
};

pub const GEOGRAPHIES_FILE: &str = "geographies.json";
pub const POLICIES_FILE: &str = "policies.json";
pub const DEVICES_FILE: &str = "devices.json";
pub const EVENTS_FILE: &str = "events.json";

/// Read a JSON array document.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<T, AdapterError> {
    let raw = read_file(path)?;
    serde_json::from_str(&raw).map_err(|e| AdapterError::Decode {
        path: path.to_path_buf(),
        source: MdscError::from(e),
    })
}

/// Read a policies document, rejecting unknown rule types by name.
pub fn read_policies_file(path: &Path) -> Result<Vec<Policy>, AdapterError> {
    let raw = read_file(path)?;
    decode_policies(&raw).map_err(|source| AdapterError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn read_file(path: &Path) -> Result<String, AdapterError> {
    std::fs::read_to_string(path).map_err(|source| AdapterError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Keep only the newest event per device.
pub fn latest_per_device(events: Vec<VehicleEvent>) -> Vec<VehicleEvent> {
    let mut latest: HashMap<DeviceId, VehicleEvent> = HashMap::new();
    for event in events {
        match latest.get(&event.device_id) {
            Some(existing) if existing.timestamp >= event.timestamp => {}
            _ => {
                latest.insert(event.device_id, event);
            }
        }
    }
    let mut events: Vec<VehicleEvent> = latest.into_values().collect();
    events.sort_by_key(|event| (event.timestamp, event.device_id));
    events
}

/// Read-only store backed by in-memory collections.
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    geographies: Vec<Geography>,
    policies: Vec<Policy>,
    devices: Vec<Device>,
    events: Vec<VehicleEvent>,
}

impl FixtureStore {
    pub fn new(
        geographies: Vec<Geography>,
        policies: Vec<Policy>,
        devices: Vec<Device>,
        events: Vec<VehicleEvent>,
    ) -> Self {
        Self {
            geographies,
            policies,
            devices,
            events: latest_per_device(events),
        }
    }

    /// Load the four fixture documents from `dir`.
    pub fn load(dir: &Path) -> Result<Self, AdapterError> {
        let store = Self::new(
            read_json_file(&dir.join(GEOGRAPHIES_FILE))?,
            read_policies_file(&dir.join(POLICIES_FILE))?,
            read_json_file(&dir.join(DEVICES_FILE))?,
            read_json_file(&dir.join(EVENTS_FILE))?,
        );
        tracing::debug!(
            dir = %dir.display(),
            geographies = store.geographies.len(),
            policies = store.policies.len(),
            devices = store.devices.len(),
            events = store.events.len(),
            "fixtures loaded"
        );
        Ok(store)
    }
}

impl PolicyStore for FixtureStore {
    fn read_active_policies(&self) -> Result<Vec<Policy>, AdapterError> {
        Ok(self.policies.clone())
    }

    fn adapter_name(&self) -> &str {
        "FixtureStore"
    }
}

impl GeographyStore for FixtureStore {
    fn read_published_geographies(&self) -> Result<Vec<Geography>, AdapterError> {
        Ok(self.geographies.clone())
    }

    fn adapter_name(&self) -> &str {
        "FixtureStore"
    }
}

impl DeviceEventGateway for FixtureStore {
    fn get_inputs(&self, provider_id: Option<&ProviderId>) -> Result<ProviderInputs, AdapterError> {
        let wanted = |p: &ProviderId| provider_id.map_or(true, |id| id == p);
        Ok(ProviderInputs {
            devices: self
                .devices
                .iter()
                .filter(|d| wanted(&d.provider_id))
                .cloned()
                .collect(),
            events: self
                .events
                .iter()
                .filter(|e| wanted(&e.provider_id))
                .cloned()
                .collect(),
        })
    }

    fn adapter_name(&self) -> &str {
        "FixtureStore"
    }
}

/// Sink that keeps every submitted batch in memory.
#[derive(Debug, Default)]
pub struct MemorySnapshotSink {
    batches: Mutex<Vec<Vec<ComplianceSnapshot>>>,
}

impl MemorySnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Vec<Vec<ComplianceSnapshot>>> {
        // A panicking writer cannot leave a half-pushed batch behind.
        self.batches.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every snapshot received, in submission order.
    pub fn snapshots(&self) -> Vec<ComplianceSnapshot> {
        self.guard().iter().flatten().cloned().collect()
    }

    /// Size of each submitted batch.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.guard().iter().map(Vec::len).collect()
    }
}

impl ComplianceSnapshotSink for MemorySnapshotSink {
    fn write_batch(&self, snapshots: &[ComplianceSnapshot]) -> Result<(), AdapterError> {
        self.guard().push(snapshots.to_vec());
        Ok(())
    }

    fn adapter_name(&self) -> &str {
        "MemorySnapshotSink"
    }
}

/// Sink appending snapshots to a JSON Lines file.
#[derive(Debug)]
pub struct JsonLinesSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonLinesSink {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, AdapterError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| AdapterError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ComplianceSnapshotSink for JsonLinesSink {
    fn write_batch(&self, snapshots: &[ComplianceSnapshot]) -> Result<(), AdapterError> {
        let io_err = |source| AdapterError::Io {
            path: self.path.clone(),
            source,
        };
        let mut buf = Vec::new();
        for snapshot in snapshots {
            serde_json::to_writer(&mut buf, snapshot).map_err(|e| AdapterError::Decode {
                path: self.path.clone(),
                source: MdscError::from(e),
            })?;
            buf.push(b'\n');
        }
        // One write per batch keeps concurrent batches from interleaving lines.
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| AdapterError::unavailable("write_batch", "writer lock poisoned"))?;
        writer.write_all(&buf).map_err(io_err)?;
        writer.flush().map_err(io_err)
    }

    fn adapter_name(&self) -> &str {
        "JsonLinesSink"
    }
}
