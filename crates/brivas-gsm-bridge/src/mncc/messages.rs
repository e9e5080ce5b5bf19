//! MNCC message definitions

use crate::types::CallRef;
use std::fmt;

macro_rules! mncc_types {
    ($($name:ident = $code:literal => $text:literal,)*) => {
        /// MNCC primitive type
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum MessageType {
            $($name,)*
            Unknown(u32),
        }

        impl MessageType {
            pub fn from_u32(value: u32) -> Self {
                match value {
                    $($code => MessageType::$name,)*
                    other => MessageType::Unknown(other),
                }
            }

            pub fn to_u32(self) -> u32 {
                match self {
                    $(MessageType::$name => $code,)*
                    MessageType::Unknown(other) => other,
                }
            }

            /// Symbolic name used in traces
            pub fn name(self) -> &'static str {
                match self {
                    $(MessageType::$name => $text,)*
                    MessageType::Unknown(_) => "MNCC_UNKNOWN",
                }
            }
        }
    };
}

mncc_types! {
    SetupReq = 0x0101 => "MNCC_SETUP_REQ",
    SetupInd = 0x0102 => "MNCC_SETUP_IND",
    SetupRsp = 0x0103 => "MNCC_SETUP_RSP",
    SetupCnf = 0x0104 => "MNCC_SETUP_CNF",
    SetupComplReq = 0x0105 => "MNCC_SETUP_COMPL_REQ",
    SetupComplInd = 0x0106 => "MNCC_SETUP_COMPL_IND",
    CallConfInd = 0x0107 => "MNCC_CALL_CONF_IND",
    CallProcReq = 0x0108 => "MNCC_CALL_PROC_REQ",
    ProgressReq = 0x0109 => "MNCC_PROGRESS_REQ",
    AlertReq = 0x010a => "MNCC_ALERT_REQ",
    AlertInd = 0x010b => "MNCC_ALERT_IND",
    NotifyReq = 0x010c => "MNCC_NOTIFY_REQ",
    NotifyInd = 0x010d => "MNCC_NOTIFY_IND",
    DiscReq = 0x010e => "MNCC_DISC_REQ",
    DiscInd = 0x010f => "MNCC_DISC_IND",
    RelReq = 0x0110 => "MNCC_REL_REQ",
    RelInd = 0x0111 => "MNCC_REL_IND",
    RelCnf = 0x0112 => "MNCC_REL_CNF",
    FacilityReq = 0x0113 => "MNCC_FACILITY_REQ",
    FacilityInd = 0x0114 => "MNCC_FACILITY_IND",
    StartDtmfInd = 0x0115 => "MNCC_START_DTMF_IND",
    StartDtmfRsp = 0x0116 => "MNCC_START_DTMF_RSP",
    StartDtmfRej = 0x0117 => "MNCC_START_DTMF_REJ",
    StopDtmfInd = 0x0118 => "MNCC_STOP_DTMF_IND",
    StopDtmfRsp = 0x0119 => "MNCC_STOP_DTMF_RSP",
    ModifyReq = 0x011a => "MNCC_MODIFY_REQ",
    ModifyInd = 0x011b => "MNCC_MODIFY_IND",
    ModifyRsp = 0x011c => "MNCC_MODIFY_RSP",
    ModifyCnf = 0x011d => "MNCC_MODIFY_CNF",
    ModifyRej = 0x011e => "MNCC_MODIFY_REJ",
    HoldInd = 0x011f => "MNCC_HOLD_IND",
    HoldCnf = 0x0120 => "MNCC_HOLD_CNF",
    HoldRej = 0x0121 => "MNCC_HOLD_REJ",
    RetrieveInd = 0x0122 => "MNCC_RETRIEVE_IND",
    RetrieveCnf = 0x0123 => "MNCC_RETRIEVE_CNF",
    RetrieveRej = 0x0124 => "MNCC_RETRIEVE_REJ",
    UserinfoReq = 0x0125 => "MNCC_USERINFO_REQ",
    UserinfoInd = 0x0126 => "MNCC_USERINFO_IND",
    RejReq = 0x0127 => "MNCC_REJ_REQ",
    RejInd = 0x0128 => "MNCC_REJ_IND",
    ProgressInd = 0x0129 => "MNCC_PROGRESS_IND",
    CallProcInd = 0x012a => "MNCC_CALL_PROC_IND",
    CallConfReq = 0x012b => "MNCC_CALL_CONF_REQ",
    StartDtmfReq = 0x012c => "MNCC_START_DTMF_REQ",
    StopDtmfReq = 0x012d => "MNCC_STOP_DTMF_REQ",
    HoldReq = 0x012e => "MNCC_HOLD_REQ",
    RetrieveReq = 0x012f => "MNCC_RETRIEVE_REQ",
    Bridge = 0x0200 => "MNCC_BRIDGE",
    FrameRecv = 0x0201 => "MNCC_FRAME_RECV",
    FrameDrop = 0x0202 => "MNCC_FRAME_DROP",
    LchanModify = 0x0203 => "MNCC_LCHAN_MODIFY",
    TchfFrame = 0x0300 => "GSM_TCHF_FRAME",
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Presence flags of the optional field groups
pub mod fields {
    pub const BEARER_CAP: u32 = 0x0001;
    pub const CALLED: u32 = 0x0002;
    pub const CALLING: u32 = 0x0004;
    pub const REDIRECTING: u32 = 0x0008;
    pub const CONNECTED: u32 = 0x0010;
    pub const CAUSE: u32 = 0x0020;
    pub const USERUSER: u32 = 0x0040;
    pub const PROGRESS: u32 = 0x0080;
    pub const EMERGENCY: u32 = 0x0100;
    pub const KEYPAD: u32 = 0x1000;
}

/// Maximum number digits carried in a number group
pub const MAX_NUMBER_LEN: usize = 32;
/// Maximum user-user octets
pub const MAX_USERUSER_LEN: usize = 128;
/// Maximum IMSI digits
pub const MAX_IMSI_LEN: usize = 15;
/// One GSM full-rate traffic frame
pub const TCHF_FRAME_LEN: usize = 33;

/// Party number group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Number {
    pub ntype: u8,
    pub plan: u8,
    pub present: u8,
    pub screen: u8,
    pub number: String,
}

/// Bearer capability group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BearerCap {
    pub transfer: u8,
    pub mode: u8,
    pub coding: u8,
    pub radio: u8,
    pub speech_ctm: u8,
    /// Supported speech versions, terminated by -1 on the wire
    pub speech_ver: Vec<i8>,
}

/// Cause group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CauseIe {
    pub location: u8,
    pub coding: u8,
    pub value: u8,
}

/// Progress indicator group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub coding: u8,
    pub location: u8,
    pub descr: u8,
}

/// User-user group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUserIe {
    pub proto: u8,
    pub info: Vec<u8>,
}

/// Calling line identity restriction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Clir {
    pub sup: u8,
    pub inv: u8,
}

/// Call-control record
///
/// Field groups guarded by a presence flag on the wire are `Option`s here;
/// the flag word is derived on encode and consulted on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallControl {
    pub msg_type: MessageType,
    pub callref: CallRef,
    pub calling: Option<Number>,
    pub called: Option<Number>,
    pub connected: Option<Number>,
    pub redirecting: Option<Number>,
    pub bearer_cap: Option<BearerCap>,
    pub cause: Option<CauseIe>,
    pub progress: Option<Progress>,
    pub useruser: Option<UserUserIe>,
    pub keypad: Option<u8>,
    pub emergency: bool,
    pub clir: Clir,
    pub notify: u8,
    pub lchan_mode: u8,
    pub imsi: String,
}

impl CallControl {
    pub fn new(msg_type: MessageType, callref: CallRef) -> Self {
        Self {
            msg_type,
            callref,
            calling: None,
            called: None,
            connected: None,
            redirecting: None,
            bearer_cap: None,
            cause: None,
            progress: None,
            useruser: None,
            keypad: None,
            emergency: false,
            clir: Clir::default(),
            notify: 0,
            lchan_mode: 0,
            imsi: String::new(),
        }
    }

    /// Presence flag word for the populated groups
    pub fn fields(&self) -> u32 {
        let mut flags = 0;
        let groups = [
            (self.bearer_cap.is_some(), fields::BEARER_CAP),
            (self.called.is_some(), fields::CALLED),
            (self.calling.is_some(), fields::CALLING),
            (self.redirecting.is_some(), fields::REDIRECTING),
            (self.connected.is_some(), fields::CONNECTED),
            (self.cause.is_some(), fields::CAUSE),
            (self.useruser.is_some(), fields::USERUSER),
            (self.progress.is_some(), fields::PROGRESS),
            (self.emergency, fields::EMERGENCY),
            (self.keypad.is_some(), fields::KEYPAD),
        ];
        for (present, flag) in groups {
            if present {
                flags |= flag;
            }
        }
        flags
    }

    /// Attach a cause with GSM coding standard
    pub fn with_cause(mut self, location: u8, value: u8) -> Self {
        self.cause = Some(CauseIe {
            location,
            coding: 3,
            value,
        });
        self
    }

    /// Attach the in-band tones progress indicator
    pub fn with_inband_progress(mut self) -> Self {
        self.progress = Some(Progress {
            coding: 3,
            location: 1,
            descr: 8,
        });
        self
    }
}

/// Voice frame record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    pub msg_type: MessageType,
    pub callref: CallRef,
    pub data: [u8; TCHF_FRAME_LEN],
}

/// Any message exchanged on the MNCC channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MnccMessage {
    Control(CallControl),
    Frame(DataFrame),
}

impl MnccMessage {
    pub fn msg_type(&self) -> MessageType {
        match self {
            MnccMessage::Control(m) => m.msg_type,
            MnccMessage::Frame(f) => f.msg_type,
        }
    }

    pub fn callref(&self) -> CallRef {
        match self {
            MnccMessage::Control(m) => m.callref,
            MnccMessage::Frame(f) => f.callref,
        }
    }
}

impl From<CallControl> for MnccMessage {
    fn from(m: CallControl) -> Self {
        MnccMessage::Control(m)
    }
}

impl From<DataFrame> for MnccMessage {
    fn from(f: DataFrame) -> Self {
        MnccMessage::Frame(f)
    }
}
