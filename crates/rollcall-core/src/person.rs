//! People known to the attendance service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a person is to the school. Only students have guardians that get
/// notified.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Student,
  Teacher,
  Staff,
}

/// A registered person. Created and edited through the admin API only; the
/// reconciliation engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
  pub id:             i64,
  pub name:           String,
  pub email:          String,
  pub phone:          Option<String>,
  pub role:           Role,
  /// Guardian phone number; ignored unless `role` is [`Role::Student`].
  #[serde(alias = "parent_phone")]
  pub guardian_phone: Option<String>,
  /// External code reported by the punch terminal, if it differs from `id`.
  #[serde(alias = "card_number")]
  pub badge_number:   Option<String>,
  pub created_at:     DateTime<Utc>,
}

impl Person {
  /// The number a guardian should be messaged on, if this person has one.
  pub fn guardian_contact(&self) -> Option<&str> {
    match self.role {
      Role::Student => self
        .guardian_phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty()),
      Role::Teacher | Role::Staff => None,
    }
  }
}

/// A [`Person`] returned by a directory search, with how many attendance
/// intervals they have.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonMatch {
  #[serde(flatten)]
  pub person:           Person,
  pub attendance_count: u64,
}

/// Input for creating or replacing a [`Person`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPerson {
  pub name:           String,
  pub email:          String,
  #[serde(default)]
  pub phone:          Option<String>,
  pub role:           Role,
  #[serde(default, alias = "parent_phone")]
  pub guardian_phone: Option<String>,
  #[serde(default, alias = "card_number")]
  pub badge_number:   Option<String>,
}

impl NewPerson {
  pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
    Self {
      name: name.into(),
      email: email.into(),
      phone: None,
      role,
      guardian_phone: None,
      badge_number: None,
    }
  }
}
