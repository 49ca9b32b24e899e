//! Proximity-beacon service data decoding.
//!
//! Only UID frames carry an identity the matcher cares about. Every other
//! frame type is decoded just far enough to give operators a readable line in
//! the debug view. Nothing in here fails: malformed input is "no identity".

use std::fmt;
use std::str::FromStr;

use anchorscan_model::RadioObservation;
use serde::{Deserialize, Serialize};

use crate::error::AnchorError;

pub const FRAME_TYPE_UID: u8 = 0x00;
pub const FRAME_TYPE_URL: u8 = 0x10;
pub const FRAME_TYPE_TLM: u8 = 0x20;
pub const FRAME_TYPE_EID: u8 = 0x30;

pub const NAMESPACE_LEN: usize = 10;
pub const INSTANCE_LEN: usize = 6;
/// Frame type, tx power, namespace and instance. Trailing reserved bytes are optional.
pub const UID_FRAME_MIN_LEN: usize = 2 + NAMESPACE_LEN + INSTANCE_LEN;

const TLM_FRAME_LEN: usize = 14;
const IBEACON_COMPANY_ID: u16 = 0x004C;
const IBEACON_PREFIX: [u8; 2] = [0x02, 0x15];
const IBEACON_LEN: usize = 2 + 2 + 16 + 2 + 2 + 1;

/// 10 byte beacon namespace that identifies this deployment's tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Namespace([u8; NAMESPACE_LEN]);

impl Namespace {
    pub const DEFAULT: Namespace = Namespace([
        0xED, 0xD1, 0xEB, 0xEA, 0xC0, 0x4E, 0x5D, 0xEF, 0xA0, 0x17,
    ]);

    pub const fn from_bytes(bytes: [u8; NAMESPACE_LEN]) -> Self {
        Namespace(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; NAMESPACE_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for Namespace {
    type Err = AnchorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '-').collect();
        let mut bytes = [0u8; NAMESPACE_LEN];
        hex::decode_to_slice(&cleaned, &mut bytes).map_err(|err| {
            AnchorError::InvalidConfig(format!(
                "namespace '{s}' must be {} hex characters: {err}",
                NAMESPACE_LEN * 2
            ))
        })?;
        Ok(Namespace(bytes))
    }
}

impl TryFrom<String> for Namespace {
    type Error = AnchorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Namespace> for String {
    fn from(value: Namespace) -> Self {
        value.to_hex()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Upper-case hex of the 6 byte instance field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn from_bytes(bytes: &[u8; INSTANCE_LEN]) -> Self {
        InstanceId(hex::encode_upper(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidFrame {
    pub tx_power: i8,
    pub namespace: Namespace,
    pub instance: [u8; INSTANCE_LEN],
}

impl UidFrame {
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < UID_FRAME_MIN_LEN || data[0] != FRAME_TYPE_UID {
            return None;
        }
        let namespace: [u8; NAMESPACE_LEN] = data[2..12].try_into().ok()?;
        let instance: [u8; INSTANCE_LEN] = data[12..18].try_into().ok()?;
        Some(UidFrame {
            tx_power: data[1] as i8,
            namespace: Namespace(namespace),
            instance,
        })
    }

    /// Full 20 byte service data payload, reserved bytes zeroed.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(UID_FRAME_MIN_LEN + 2);
        out.push(FRAME_TYPE_UID);
        out.push(self.tx_power as u8);
        out.extend_from_slice(self.namespace.as_bytes());
        out.extend_from_slice(&self.instance);
        out.extend_from_slice(&[0, 0]);
        out
    }

    pub fn instance_id(&self) -> InstanceId {
        InstanceId::from_bytes(&self.instance)
    }
}

/// Instance identifier of a UID frame in the expected namespace, else `None`.
pub fn decode_instance(
    service_data: Option<&[u8]>,
    expected: &Namespace,
) -> Option<InstanceId> {
    let frame = UidFrame::parse(service_data?)?;
    (frame.namespace == *expected).then(|| frame.instance_id())
}

/// One-line human description of whatever the observation carried.
pub fn describe(observation: &RadioObservation, expected: &Namespace) -> String {
    let mut parts = Vec::new();
    if let Some(data) = observation.service_data.as_deref() {
        parts.push(describe_service_data(data, expected));
    }
    if let Some(data) = observation.manufacturer_data.as_deref() {
        parts.push(describe_manufacturer_data(data));
    }
    if parts.is_empty() {
        "no beacon payload".to_string()
    } else {
        parts.join("; ")
    }
}

fn describe_service_data(data: &[u8], expected: &Namespace) -> String {
    let Some(&frame_type) = data.first() else {
        return "empty service data".to_string();
    };
    match frame_type {
        FRAME_TYPE_UID => match UidFrame::parse(data) {
            Some(frame) => {
                let foreign = if frame.namespace == *expected {
                    ""
                } else {
                    " (foreign namespace)"
                };
                format!(
                    "UID ns={} inst={} tx={}dBm{foreign}",
                    frame.namespace,
                    frame.instance_id(),
                    frame.tx_power
                )
            }
            None => format!("UID truncated ({} bytes)", data.len()),
        },
        FRAME_TYPE_URL => match decode_url(data) {
            Some(url) => format!("URL {url} tx={}dBm", data[1] as i8),
            None => format!("URL truncated ({} bytes)", data.len()),
        },
        FRAME_TYPE_TLM => describe_tlm(data),
        FRAME_TYPE_EID => format!("EID ({} bytes)", data.len()),
        other => format!("service frame 0x{other:02X} ({} bytes)", data.len()),
    }
}

fn decode_url(data: &[u8]) -> Option<String> {
    if data.len() < 4 {
        return None;
    }
    let mut url = String::from(match data[2] {
        0x00 => "http://www.",
        0x01 => "https://www.",
        0x02 => "http://",
        0x03 => "https://",
        _ => return None,
    });
    for &byte in &data[3..] {
        match byte {
            0x00 => url.push_str(".com/"),
            0x01 => url.push_str(".org/"),
            0x02 => url.push_str(".edu/"),
            0x03 => url.push_str(".net/"),
            0x04 => url.push_str(".info/"),
            0x05 => url.push_str(".biz/"),
            0x06 => url.push_str(".gov/"),
            0x07 => url.push_str(".com"),
            0x08 => url.push_str(".org"),
            0x09 => url.push_str(".edu"),
            0x0A => url.push_str(".net"),
            0x0B => url.push_str(".info"),
            0x0C => url.push_str(".biz"),
            0x0D => url.push_str(".gov"),
            0x21..=0x7E => url.push(byte as char),
            _ => {}
        }
    }
    Some(url)
}

fn describe_tlm(data: &[u8]) -> String {
    if data.len() < TLM_FRAME_LEN {
        return format!("TLM truncated ({} bytes)", data.len());
    }
    if data[1] != 0x00 {
        return format!("TLM encrypted v{}", data[1]);
    }
    let battery_mv = u16::from_be_bytes([data[2], data[3]]);
    let temperature = i16::from_be_bytes([data[4], data[5]]) as f32 / 256.0;
    let adv_count = u32::from_be_bytes([data[6], data[7], data[8], data[9]]);
    let uptime_secs =
        u32::from_be_bytes([data[10], data[11], data[12], data[13]]) / 10;
    format!(
        "TLM battery={battery_mv}mV temp={temperature:.1}C adv={adv_count} uptime={uptime_secs}s"
    )
}

fn describe_manufacturer_data(data: &[u8]) -> String {
    if data.len() < 2 {
        return format!("manufacturer data ({} bytes)", data.len());
    }
    let company = u16::from_le_bytes([data[0], data[1]]);
    let payload = &data[2..];
    if company == IBEACON_COMPANY_ID
        && data.len() >= IBEACON_LEN
        && payload[..2] == IBEACON_PREFIX
    {
        let uuid = hex::encode_upper(&payload[2..18]);
        let major = u16::from_be_bytes([payload[18], payload[19]]);
        let minor = u16::from_be_bytes([payload[20], payload[21]]);
        let tx = payload[22] as i8;
        return format!(
            "iBeacon uuid={uuid} major={major} minor={minor} tx={tx}dBm"
        );
    }
    format!("manufacturer 0x{company:04X}: {}", hex::encode_upper(payload))
}
