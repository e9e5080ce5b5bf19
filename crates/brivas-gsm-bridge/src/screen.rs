//! Outbound identity screening
//!
//! Rewrites the identity presented towards the GSM side before it is
//! encoded into a connect response. Rules are evaluated in order and the
//! first match wins.

use crate::types::{NumberType, PartyInfo, Presentation};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One screening rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenRule {
    /// Number to match; a trailing `%` matches any suffix
    pub matches: String,
    /// Replacement; for prefix rules the unmatched suffix is appended
    pub replace: String,
    /// Override of the number type
    #[serde(default)]
    pub ntype: Option<NumberType>,
    /// Override of the presentation indicator
    #[serde(default)]
    pub present: Option<Presentation>,
}

impl ScreenRule {
    fn apply(&self, number: &str) -> Option<String> {
        match self.matches.strip_suffix('%') {
            Some(prefix) => number
                .strip_prefix(prefix)
                .map(|rest| format!("{}{}", self.replace, rest)),
            None if self.matches == number => Some(self.replace.clone()),
            None => None,
        }
    }
}

/// Apply outbound screening rules to an identity in place.
///
/// Returns true if a rule matched.
pub fn screen_outgoing(rules: &[ScreenRule], info: &mut PartyInfo) -> bool {
    for rule in rules {
        if let Some(number) = rule.apply(&info.id) {
            debug!(from = %info.id, to = %number, "Screened outgoing identity");
            info.id = number;
            if let Some(ntype) = rule.ntype {
                info.ntype = ntype;
            }
            if let Some(present) = rule.present {
                info.present = present;
            }
            return true;
        }
    }
    false
}
