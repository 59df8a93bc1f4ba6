/*!
 * bluetoothctl Version Gate
 * BlueZ 5.66 replaced `paired-devices` with `devices Paired`
 */

use serde::Serialize;

use crate::error::VersionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
}

/// Sub-command used to list paired devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PairedListing {
    /// `devices Paired`
    Modern,
    /// `paired-devices`
    Legacy,
}

impl PairedListing {
    pub fn args(self) -> &'static [&'static str] {
        match self {
            PairedListing::Modern => &["devices", "Paired"],
            PairedListing::Legacy => &["paired-devices"],
        }
    }
}

/// Reads `(major, minor)` out of the tool's self-reported version.
///
/// Every maximal run of ASCII digits is one component and exactly two
/// must be present, so `"Version 5.66"` parses while `"5"` or
/// `"5.66.1"` do not.
pub fn parse_tool_version(text: &str) -> Result<ToolVersion, VersionError> {
    let runs: Vec<&str> = text
        .split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .collect();

    match runs.as_slice() {
        [major, minor] => Ok(ToolVersion {
            major: component(major)?,
            minor: component(minor)?,
        }),
        other => Err(VersionError::UnexpectedComponents(other.len())),
    }
}

fn component(run: &str) -> Result<u32, VersionError> {
    run.parse()
        .map_err(|_| VersionError::Overflow(run.to_string()))
}

/// Picks the listing form for a `version` output. Anything that does not
/// parse falls back to the legacy form.
pub fn select_paired_listing(version_output: &str) -> PairedListing {
    match parse_tool_version(version_output) {
        Ok(v) if v.major >= 5 && v.minor >= 66 => PairedListing::Modern,
        Ok(v) => {
            tracing::debug!("bluetoothctl {}.{} predates `devices Paired`", v.major, v.minor);
            PairedListing::Legacy
        }
        Err(e) => {
            tracing::debug!("Unrecognised bluetoothctl version {:?}: {}", version_output, e);
            PairedListing::Legacy
        }
    }
}
