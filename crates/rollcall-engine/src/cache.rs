//! In-memory guard against duplicate punches.
//!
//! Not authoritative: it is lost on restart and the reconciler re-derives
//! state from storage for every punch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rollcall_core::{attendance::Action, punch::RawPunch};

/// The last accepted punch for one employee code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
  pub time:   DateTime<Utc>,
  pub action: Action,
}

/// Bounded map from employee code to its last accepted punch, plus a memo of
/// the last punch that was decided either way.
#[derive(Debug)]
pub struct PunchCache {
  entries:      HashMap<String, CacheEntry>,
  capacity:     usize,
  /// The terminal keeps reporting its newest punch on every poll.
  last_decided: Option<(String, DateTime<Utc>)>,
}

impl PunchCache {
  pub fn new(capacity: usize) -> Self {
    Self {
      entries:      HashMap::new(),
      capacity:     capacity.max(1),
      last_decided: None,
    }
  }

  pub fn get(&self, emp_code: &str) -> Option<CacheEntry> { self.entries.get(emp_code).copied() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  /// Remember an accepted punch, evicting the oldest entry when full.
  pub fn record(&mut self, emp_code: &str, entry: CacheEntry) {
    if !self.entries.contains_key(emp_code) && self.entries.len() >= self.capacity {
      let oldest = self
        .entries
        .iter()
        .min_by_key(|(_, e)| e.time)
        .map(|(code, _)| code.clone());
      if let Some(code) = oldest {
        self.entries.remove(&code);
      }
    }
    self.entries.insert(emp_code.to_owned(), entry);
  }

  /// Drop what is remembered for `emp_code`, so its next punch is decided
  /// from storage alone.
  pub fn forget(&mut self, emp_code: &str) { self.entries.remove(emp_code); }

  pub fn is_decided(&self, punch: &RawPunch) -> bool {
    self
      .last_decided
      .as_ref()
      .is_some_and(|(code, time)| *code == punch.emp_code && *time == punch.punch_time)
  }

  pub fn mark_decided(&mut self, punch: &RawPunch) {
    self.last_decided = Some((punch.emp_code.clone(), punch.punch_time));
  }
}
