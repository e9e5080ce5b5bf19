//! Common types for call control

use serde::{Deserialize, Serialize};
use std::fmt;

/// Call reference shared with the GSM stack
pub type CallRef = u32;

/// Bridge-local serial identifying one call object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(pub u64);

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// Call-routing engine endpoint attached to a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId(pub u64);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ep-{}", self.0)
    }
}

/// Side of the GSM stack this link talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkRole {
    /// Base-station controller (network side)
    Network,
    /// Mobile station
    MobileStation,
}

impl LinkRole {
    /// Direction label used in message traces
    pub fn trace_label(&self) -> &'static str {
        match self {
            LinkRole::Network => "LCR<->BSC",
            LinkRole::MobileStation => "LCR<->MS",
        }
    }
}

/// Line encoding of the voice transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Law {
    #[default]
    Alaw,
    Ulaw,
}

impl Law {
    /// Layer-1 info value carried in bearer capability
    pub fn bearer_info1(&self) -> u8 {
        match self {
            Law::Alaw => 3,
            Law::Ulaw => 2,
        }
    }
}

/// Type of number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberType {
    #[default]
    NotPresent,
    Unknown,
    International,
    National,
    Subscriber,
}

/// Presentation indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presentation {
    #[default]
    Allowed,
    Restricted,
    NotAvailable,
}

/// Screening indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screening {
    #[default]
    User,
    UserVerifiedPassed,
    UserVerifiedFailed,
    Network,
}

/// Identity of a calling, called, redirecting or connected party
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartyInfo {
    pub id: String,
    pub ntype: NumberType,
    pub present: Presentation,
    pub screen: Screening,
    pub imsi: String,
    pub interface: String,
    pub port: u32,
}

impl PartyInfo {
    /// Identity carrying only a number
    pub fn number(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ntype: NumberType::Unknown,
            ..Default::default()
        }
    }
}

/// Bearer capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BearerCapability {
    #[default]
    Speech,
    Audio,
    DataUnrestricted,
    DataRestricted,
}

/// Bearer transfer mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BearerMode {
    #[default]
    Circuit,
    Packet,
}

/// Negotiated media description of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityInfo {
    pub capability: BearerCapability,
    pub mode: BearerMode,
    pub info1: u8,
}

/// User-user information
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUser {
    pub protocol: u8,
    pub data: Vec<u8>,
}

/// Setup parameters exchanged with the call-routing engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetupInfo {
    pub caller: PartyInfo,
    pub dialing: PartyInfo,
    pub redirect: PartyInfo,
    pub capability: CapabilityInfo,
    pub useruser: UserUser,
    pub port: u32,
}

/// Cause and location attached to disconnect and release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cause {
    pub location: u8,
    pub value: u8,
}

impl Cause {
    pub const fn new(value: u8, location: u8) -> Self {
        Self { location, value }
    }

    /// Cause raised locally by the bridge
    pub const fn local(value: u8) -> Self {
        Self::new(value, location::PRIVATE_LOCAL)
    }
}

impl Default for Cause {
    fn default() -> Self {
        Self::new(cause::NORMAL_CLEARING, location::USER)
    }
}

/// Q.850 cause values
pub mod cause {
    pub const NORMAL_CLEARING: u8 = 16;
    pub const DESTINATION_OUT_OF_ORDER: u8 = 27;
    pub const INVALID_NUMBER_FORMAT: u8 = 28;
    pub const NO_CIRCUIT_AVAILABLE: u8 = 34;
    pub const RESOURCE_UNAVAILABLE: u8 = 47;
}

/// Q.850 location values
pub mod location {
    pub const USER: u8 = 0;
    pub const PRIVATE_LOCAL: u8 = 1;
}

/// Notification codes forwarded to the engine
pub mod notify {
    pub const REMOTE_HOLD: u8 = 0xf9;
    pub const REMOTE_RETRIEVAL: u8 = 0xfa;
}
