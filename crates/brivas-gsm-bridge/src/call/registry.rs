//! Active calls of one link

use super::{Call, CallState};
use crate::types::{CallId, CallRef};
use metrics::gauge;

/// Arena of calls, searched linearly
#[derive(Debug)]
pub struct CallRegistry {
    calls: Vec<Call>,
    next_id: u64,
    next_callref: CallRef,
}

impl Default for CallRegistry {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            next_id: 1,
            next_callref: 1,
        }
    }
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a call and return its id
    pub fn create(&mut self, callref: CallRef, port: u32, state: CallState) -> CallId {
        let id = CallId(self.next_id);
        self.next_id += 1;
        self.calls.push(Call::new(id, callref, port, state));
        gauge!("gsm_calls_active").set(self.calls.len() as f64);
        id
    }

    pub fn get(&self, id: CallId) -> Option<&Call> {
        self.calls.iter().find(|c| c.id() == id)
    }

    pub fn get_mut(&mut self, id: CallId) -> Option<&mut Call> {
        self.calls.iter_mut().find(|c| c.id() == id)
    }

    /// Call bound to a reference; unassigned references never match
    pub fn find(&self, callref: CallRef) -> Option<CallId> {
        if callref == 0 {
            return None;
        }
        self.calls
            .iter()
            .find(|c| c.callref() == callref)
            .map(Call::id)
    }

    /// Calls bound to a port, in creation order
    pub fn ids_on_port(&self, port: u32) -> Vec<CallId> {
        self.calls
            .iter()
            .filter(|c| c.port() == port)
            .map(Call::id)
            .collect()
    }

    pub fn remove(&mut self, id: CallId) -> Option<Call> {
        let pos = self.calls.iter().position(|c| c.id() == id)?;
        let call = self.calls.remove(pos);
        gauge!("gsm_calls_active").set(self.calls.len() as f64);
        Some(call)
    }

    /// Next unused reference for a locally originated call
    pub fn new_callref(&mut self) -> CallRef {
        loop {
            let candidate = self.next_callref;
            self.next_callref = self.next_callref.wrapping_add(1).max(1);
            if self.find(candidate).is_none() {
                return candidate;
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Call> {
        self.calls.iter()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
