//! # mdsc-cli: Command-Line Interface
//!
//! Provides the `mdsc` binary.
//!
//! ## Subcommands
//!
//! - `mdsc evaluate`: evaluate policies for one provider from JSON files
//!   and print the engine results. Reproduces a field issue without any
//!   live infrastructure.
//! - `mdsc batch`: one supervised batch run over a fixture directory.
//!
//! ```bash
//! TIMEZONE=America/Los_Angeles mdsc evaluate \
//!     --geographies geographies.json --devices devices.json \
//!     --events events.json --policies policies.json \
//!     --provider-id 5f7114d1-4091-46ee-b492-e55875f7de00
//!
//! TIMEZONE=America/Los_Angeles mdsc batch --fixtures ./fixtures --output snapshots.jsonl
//! ```

pub mod batch;
pub mod evaluate;

use anyhow::{Context, Result};
use mdsc_core::Timestamp;

/// Parse an evaluation instant given as RFC 3339 or epoch milliseconds.
pub fn parse_instant(raw: &str) -> Result<Timestamp> {
    if let Ok(millis) = raw.parse::<i64>() {
        return Timestamp::from_epoch_millis(millis).with_context(|| format!("timestamp out of range: {raw}"));
    }
    let parsed = chrono::DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("expected RFC 3339 or epoch milliseconds, got {raw:?}"))?;
    Ok(Timestamp::from_utc(parsed.with_timezone(&chrono::Utc)))
}
