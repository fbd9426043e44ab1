//! Parish groups (choir, youth league, women's guild…) that
//! members join.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Result, validate};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
  pub association_id: Uuid,
  /// Unique across the parish.
  pub name:           String,
  pub description:    Option<String>,
  pub created_at:     DateTime<Utc>,
}

impl Association {
  /// An empty description clears it.
  pub fn apply(&mut self, patch: AssociationPatch) {
    if let Some(name) = patch.name {
      self.name = name.trim().to_owned();
    }
    if let Some(description) = patch.description {
      self.description = Some(description).filter(|d| !d.trim().is_empty());
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssociation {
  pub name:        String,
  #[serde(default)]
  pub description: Option<String>,
}

impl NewAssociation {
  pub fn validate(&self) -> Result<()> {
    validate::length("name", &self.name, 3, 255)?;
    validate::optional_length("description", self.description.as_deref(), 1000)
  }

  pub fn into_association(self, association_id: Uuid, created_at: DateTime<Utc>) -> Association {
    Association {
      association_id,
      name: self.name.trim().to_owned(),
      description: self.description.filter(|d| !d.trim().is_empty()),
      created_at,
    }
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationPatch {
  pub name:        Option<String>,
  pub description: Option<String>,
}

impl AssociationPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(name) = &self.name {
      validate::length("name", name, 3, 255)?;
    }
    validate::optional_length("description", self.description.as_deref(), 1000)
  }
}

/// A member's place in an association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
  pub member_id:      Uuid,
  pub association_id: Uuid,
  /// Free-text role, e.g. "president" or "treasurer".
  pub role:           Option<String>,
  pub joined_on:      NaiveDate,
}

/// Input to [`crate::store::ParishStore::add_member_to_association`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMembership {
  pub association_id: Uuid,
  #[serde(default)]
  pub role:           Option<String>,
  /// Defaults to today.
  #[serde(default)]
  pub joined_on:      Option<NaiveDate>,
}

impl NewMembership {
  pub fn validate(&self) -> Result<()> {
    validate::optional_length("role", self.role.as_deref(), 100)
  }

  pub fn into_membership(self, member_id: Uuid, today: NaiveDate) -> Membership {
    Membership {
      member_id,
      association_id: self.association_id,
      role: self.role.filter(|r| !r.trim().is_empty()),
      joined_on: self.joined_on.unwrap_or(today),
    }
  }
}
