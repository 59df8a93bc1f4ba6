/*!
 * Typed Views over bluetoothctl Output
 * Optional helpers; the facade itself never parses
 */

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceEntry {
    pub address: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub address: String,
    pub name: Option<String>,
    pub alias: Option<String>,
    pub paired: bool,
    pub trusted: bool,
    pub connected: bool,
    pub battery_percentage: Option<u8>,
    /// Every `Key: value` line in order; `UUID` appears once per profile.
    pub properties: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdapterStatus {
    pub address: String,
    pub name: Option<String>,
    pub powered: bool,
    pub discoverable: bool,
    pub pairable: bool,
}

/// Parses `Device <address> <name>` lines, keeping the tool's order.
pub fn parse_paired_devices(text: &str) -> Vec<DeviceEntry> {
    text.lines()
        .filter_map(|line| {
            let rest = line.trim().strip_prefix("Device ")?;
            let (address, name) = match rest.split_once(' ') {
                Some((address, name)) => (address, name.trim()),
                None => (rest, ""),
            };
            Some(DeviceEntry {
                address: address.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

/// Returns `None` for output without a `Device <address>` header, which is
/// what the tool prints for unknown devices.
pub fn parse_device_info(text: &str) -> Option<DeviceInfo> {
    let (address, properties) = header_and_properties(text, "Device ")?;

    let mut info = DeviceInfo {
        address,
        ..Default::default()
    };
    for (key, value) in &properties {
        match key.as_str() {
            "Name" => info.name = Some(value.clone()),
            "Alias" => info.alias = Some(value.clone()),
            "Paired" => info.paired = is_yes(value),
            "Trusted" => info.trusted = is_yes(value),
            "Connected" => info.connected = is_yes(value),
            "Battery Percentage" => info.battery_percentage = battery_percentage(value),
            _ => {}
        }
    }
    info.properties = properties;
    Some(info)
}

/// Returns `None` when no controller block is present
/// (`No default controller available`).
pub fn parse_adapter_status(text: &str) -> Option<AdapterStatus> {
    let (address, properties) = header_and_properties(text, "Controller ")?;

    let mut status = AdapterStatus {
        address,
        ..Default::default()
    };
    for (key, value) in properties {
        match key.as_str() {
            "Name" => status.name = Some(value),
            "Powered" => status.powered = is_yes(&value),
            "Discoverable" => status.discoverable = is_yes(&value),
            "Pairable" => status.pairable = is_yes(&value),
            _ => {}
        }
    }
    Some(status)
}

fn header_and_properties(text: &str, prefix: &str) -> Option<(String, Vec<(String, String)>)> {
    let mut lines = text.lines().skip_while(|line| !line.starts_with(prefix));

    let header = lines.next()?.strip_prefix(prefix)?;
    let address = header.split_whitespace().next()?;
    // "Device AA:.. not available" is a header-shaped error line
    if header.trim_end().ends_with("not available") {
        return None;
    }

    let properties = lines
        .take_while(|line| line.starts_with('\t') || line.starts_with(' '))
        .filter_map(|line| {
            let (key, value) = line.trim().split_once(':')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect();

    Some((address.to_string(), properties))
}

fn is_yes(value: &str) -> bool {
    value.eq_ignore_ascii_case("yes")
}

// "0x5a (90)"
fn battery_percentage(value: &str) -> Option<u8> {
    let inner = value.split_once('(')?.1.strip_suffix(')')?;
    inner.trim().parse().ok()
}
