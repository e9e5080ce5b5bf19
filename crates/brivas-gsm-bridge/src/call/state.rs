//! Call states and the transitions between them

use std::fmt;

/// State of one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallState {
    InPrepare,
    InSetup,
    InDialing,
    InProceeding,
    InAlerting,
    OutPrepare,
    OutSetup,
    OutDialing,
    OutProceeding,
    OutAlerting,
    Connect,
    InDisconnect,
    OutDisconnect,
    Release,
}

impl CallState {
    pub fn name(self) -> &'static str {
        match self {
            CallState::InPrepare => "IN_PREPARE",
            CallState::InSetup => "IN_SETUP",
            CallState::InDialing => "IN_DIALING",
            CallState::InProceeding => "IN_PROCEEDING",
            CallState::InAlerting => "IN_ALERTING",
            CallState::OutPrepare => "OUT_PREPARE",
            CallState::OutSetup => "OUT_SETUP",
            CallState::OutDialing => "OUT_DIALING",
            CallState::OutProceeding => "OUT_PROCEEDING",
            CallState::OutAlerting => "OUT_ALERTING",
            CallState::Connect => "CONNECT",
            CallState::InDisconnect => "IN_DISCONNECT",
            CallState::OutDisconnect => "OUT_DISCONNECT",
            CallState::Release => "RELEASE",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == CallState::Release
    }

    /// Whether the transition graph has an edge from `self` to `next`.
    /// Staying in a non-terminal state is always allowed.
    pub fn can_enter(self, next: CallState) -> bool {
        use CallState::*;

        if self == next {
            return !self.is_terminal();
        }
        match self {
            InPrepare => matches!(next, InSetup | InDialing | InProceeding | Release),
            InSetup => matches!(next, InDialing | InProceeding | Release),
            InDialing => matches!(next, InProceeding | Release),
            InProceeding => matches!(
                next,
                InAlerting | Connect | OutDisconnect | InDisconnect | Release
            ),
            InAlerting => matches!(next, Connect | OutDisconnect | InDisconnect | Release),
            OutPrepare => matches!(next, OutSetup | Release),
            OutSetup | OutDialing => matches!(
                next,
                OutDialing | OutProceeding | OutAlerting | Connect | OutDisconnect | InDisconnect | Release
            ),
            OutProceeding => matches!(
                next,
                OutAlerting | Connect | OutDisconnect | InDisconnect | Release
            ),
            OutAlerting => matches!(next, Connect | OutDisconnect | InDisconnect | Release),
            Connect => matches!(next, OutDisconnect | InDisconnect | Release),
            InDisconnect | OutDisconnect => next == Release,
            Release => false,
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CallState::*;

    const ALL: [CallState; 14] = [
        InPrepare,
        InSetup,
        InDialing,
        InProceeding,
        InAlerting,
        OutPrepare,
        OutSetup,
        OutDialing,
        OutProceeding,
        OutAlerting,
        Connect,
        InDisconnect,
        OutDisconnect,
        Release,
    ];

    #[test]
    fn test_release_is_terminal() {
        for state in ALL {
            assert!(!Release.can_enter(state), "RELEASE -> {state}");
            if state != Release {
                assert!(state.can_enter(Release), "{state} -> RELEASE");
            }
        }
    }

    #[test]
    fn test_directions_do_not_mix() {
        assert!(!InProceeding.can_enter(OutProceeding));
        assert!(!OutSetup.can_enter(InAlerting));
        assert!(!OutPrepare.can_enter(Connect));
        assert!(!Connect.can_enter(OutAlerting));
    }

    #[test]
    fn test_setup_paths() {
        assert!(InPrepare.can_enter(InProceeding));
        assert!(InProceeding.can_enter(InAlerting));
        assert!(InAlerting.can_enter(Connect));
        assert!(OutPrepare.can_enter(OutSetup));
        assert!(OutSetup.can_enter(OutProceeding));
        assert!(OutProceeding.can_enter(Connect));
    }
}
