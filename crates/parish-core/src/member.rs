//! A parishioner identified by a [`Matricule`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use crate::{Matricule, Result, validate};

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Gender {
  Male,
  Female,
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaritalStatus {
  #[default]
  Single,
  Married,
  Widowed,
  Divorced,
}

/// Age band used for pastoral grouping.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemberCategory {
  #[default]
  Adult,
  Youth,
  Child,
}

/// Whether the member is still part of the parish.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemberSituation {
  #[default]
  Active,
  Inactive,
  Deceased,
  Transferred,
}

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MembershipStatus {
  #[default]
  Visitor,
  Member,
  Catechumen,
}

// ─── Member ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
  pub member_id:         Uuid,
  /// Assigned by the store on creation; never changes.
  pub matricule:         Matricule,
  pub first_name:        String,
  pub last_name:         String,
  pub gender:            Gender,
  pub date_of_birth:     Option<NaiveDate>,
  pub place_of_birth:    Option<String>,
  pub email:             Option<String>,
  pub phone:             Option<String>,
  pub address:           Option<String>,
  pub neighborhood:      Option<String>,
  pub profession:        Option<String>,
  pub marital_status:    MaritalStatus,
  pub baptism_date:      Option<NaiveDate>,
  pub baptism_place:     Option<String>,
  pub join_date:         NaiveDate,
  pub category:          MemberCategory,
  pub situation:         MemberSituation,
  pub membership_status: MembershipStatus,
  pub notes:             Option<String>,
  pub created_at:        DateTime<Utc>,
}

impl Member {
  pub fn full_name(&self) -> String { format!("{} {}", self.first_name, self.last_name) }

  /// Apply a validated patch in place.
  pub fn apply(&mut self, patch: MemberPatch) {
    let MemberPatch {
      first_name,
      last_name,
      gender,
      date_of_birth,
      place_of_birth,
      email,
      phone,
      address,
      neighborhood,
      profession,
      marital_status,
      baptism_date,
      baptism_place,
      join_date,
      category,
      situation,
      membership_status,
      notes,
    } = patch;

    if let Some(v) = first_name { self.first_name = v; }
    if let Some(v) = last_name { self.last_name = v; }
    if let Some(v) = gender { self.gender = v; }
    if let Some(v) = marital_status { self.marital_status = v; }
    if let Some(v) = join_date { self.join_date = v; }
    if let Some(v) = category { self.category = v; }
    if let Some(v) = situation { self.situation = v; }
    if let Some(v) = membership_status { self.membership_status = v; }
    if date_of_birth.is_some() { self.date_of_birth = date_of_birth; }
    if baptism_date.is_some() { self.baptism_date = baptism_date; }
    // Empty strings clear optional text fields.
    for (slot, value) in [
      (&mut self.place_of_birth, place_of_birth),
      (&mut self.email, email),
      (&mut self.phone, phone),
      (&mut self.address, address),
      (&mut self.neighborhood, neighborhood),
      (&mut self.profession, profession),
      (&mut self.baptism_place, baptism_place),
      (&mut self.notes, notes),
    ] {
      if let Some(v) = value {
        *slot = non_empty(v);
      }
    }
  }
}

fn non_empty(v: String) -> Option<String> {
  let trimmed = v.trim();
  if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
}

// ─── NewMember ───────────────────────────────────────────────────────────────

/// Input to [`crate::store::ParishStore::create_member`]. The matricule and
/// `created_at` are always set by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
  pub first_name:        String,
  pub last_name:         String,
  pub gender:            Gender,
  #[serde(default)]
  pub date_of_birth:     Option<NaiveDate>,
  #[serde(default)]
  pub place_of_birth:    Option<String>,
  #[serde(default)]
  pub email:             Option<String>,
  #[serde(default)]
  pub phone:             Option<String>,
  #[serde(default)]
  pub address:           Option<String>,
  #[serde(default)]
  pub neighborhood:      Option<String>,
  #[serde(default)]
  pub profession:        Option<String>,
  #[serde(default)]
  pub marital_status:    MaritalStatus,
  #[serde(default)]
  pub baptism_date:      Option<NaiveDate>,
  #[serde(default)]
  pub baptism_place:     Option<String>,
  /// Defaults to the creation date.
  #[serde(default)]
  pub join_date:         Option<NaiveDate>,
  #[serde(default)]
  pub category:          MemberCategory,
  #[serde(default)]
  pub situation:         MemberSituation,
  #[serde(default)]
  pub membership_status: MembershipStatus,
  #[serde(default)]
  pub notes:             Option<String>,
}

impl NewMember {
  /// Convenience constructor with every optional field left empty.
  pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, gender: Gender) -> Self {
    Self {
      first_name: first_name.into(),
      last_name: last_name.into(),
      gender,
      date_of_birth: None,
      place_of_birth: None,
      email: None,
      phone: None,
      address: None,
      neighborhood: None,
      profession: None,
      marital_status: MaritalStatus::default(),
      baptism_date: None,
      baptism_place: None,
      join_date: None,
      category: MemberCategory::default(),
      situation: MemberSituation::default(),
      membership_status: MembershipStatus::default(),
      notes: None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    validate::length("first_name", &self.first_name, 2, 100)?;
    validate::length("last_name", &self.last_name, 2, 100)?;
    check_optional_fields(
      self.place_of_birth.as_deref(),
      self.email.as_deref(),
      self.phone.as_deref(),
      self.address.as_deref(),
      self.neighborhood.as_deref(),
      self.profession.as_deref(),
      self.baptism_place.as_deref(),
      self.notes.as_deref(),
    )
  }

  /// Build the stored record once the store has picked the identity fields.
  pub fn into_member(
    self,
    member_id: Uuid,
    matricule: Matricule,
    created_at: DateTime<Utc>,
  ) -> Member {
    Member {
      member_id,
      matricule,
      first_name: self.first_name.trim().to_owned(),
      last_name: self.last_name.trim().to_owned(),
      gender: self.gender,
      date_of_birth: self.date_of_birth,
      place_of_birth: self.place_of_birth.and_then(non_empty),
      email: self.email.and_then(non_empty),
      phone: self.phone.and_then(non_empty),
      address: self.address.and_then(non_empty),
      neighborhood: self.neighborhood.and_then(non_empty),
      profession: self.profession.and_then(non_empty),
      marital_status: self.marital_status,
      baptism_date: self.baptism_date,
      baptism_place: self.baptism_place.and_then(non_empty),
      join_date: self.join_date.unwrap_or_else(|| created_at.date_naive()),
      category: self.category,
      situation: self.situation,
      membership_status: self.membership_status,
      notes: self.notes.and_then(non_empty),
      created_at,
    }
  }
}

// ─── MemberPatch ─────────────────────────────────────────────────────────────

/// Partial update; `None` leaves a field untouched, an empty string clears an
/// optional text field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemberPatch {
  pub first_name:        Option<String>,
  pub last_name:         Option<String>,
  pub gender:            Option<Gender>,
  pub date_of_birth:     Option<NaiveDate>,
  pub place_of_birth:    Option<String>,
  pub email:             Option<String>,
  pub phone:             Option<String>,
  pub address:           Option<String>,
  pub neighborhood:      Option<String>,
  pub profession:        Option<String>,
  pub marital_status:    Option<MaritalStatus>,
  pub baptism_date:      Option<NaiveDate>,
  pub baptism_place:     Option<String>,
  pub join_date:         Option<NaiveDate>,
  pub category:          Option<MemberCategory>,
  pub situation:         Option<MemberSituation>,
  pub membership_status: Option<MembershipStatus>,
  pub notes:             Option<String>,
}

impl MemberPatch {
  pub fn validate(&self) -> Result<()> {
    if let Some(v) = &self.first_name {
      validate::length("first_name", v, 2, 100)?;
    }
    if let Some(v) = &self.last_name {
      validate::length("last_name", v, 2, 100)?;
    }
    check_optional_fields(
      self.place_of_birth.as_deref(),
      self.email.as_deref(),
      self.phone.as_deref(),
      self.address.as_deref(),
      self.neighborhood.as_deref(),
      self.profession.as_deref(),
      self.baptism_place.as_deref(),
      self.notes.as_deref(),
    )
  }
}

#[allow(clippy::too_many_arguments)]
fn check_optional_fields(
  place_of_birth: Option<&str>,
  email: Option<&str>,
  phone: Option<&str>,
  address: Option<&str>,
  neighborhood: Option<&str>,
  profession: Option<&str>,
  baptism_place: Option<&str>,
  notes: Option<&str>,
) -> Result<()> {
  validate::optional_length("place_of_birth", place_of_birth, 255)?;
  validate::optional_length("address", address, 500)?;
  validate::optional_length("neighborhood", neighborhood, 100)?;
  validate::optional_length("profession", profession, 100)?;
  validate::optional_length("baptism_place", baptism_place, 255)?;
  validate::optional_length("notes", notes, 1000)?;
  if let Some(v) = email.map(str::trim).filter(|v| !v.is_empty()) {
    validate::email(v)?;
  }
  if let Some(v) = phone.map(str::trim).filter(|v| !v.is_empty()) {
    validate::phone(v)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  #[test]
  fn new_member_defaults() {
    let now = Utc::now();
    let member = NewMember::new("Jean", "Mballa", Gender::Male).into_member(
      Uuid::new_v4(),
      Matricule::FIRST,
      now,
    );
    assert_eq!(member.join_date, now.date_naive());
    assert_eq!(member.category, MemberCategory::Adult);
    assert_eq!(member.membership_status, MembershipStatus::Visitor);
    assert_eq!(member.full_name(), "Jean Mballa");
  }

  #[test]
  fn validation_rejects_short_names_and_bad_contacts() {
    assert!(NewMember::new("J", "Mballa", Gender::Male).validate().is_err());

    let mut input = NewMember::new("Jean", "Mballa", Gender::Male);
    input.phone = Some("12345".into());
    assert!(matches!(input.validate(), Err(Error::InvalidInput(_))));

    input.phone = Some(String::new());
    input.email = Some("jean@paroisse.cm".into());
    assert!(input.validate().is_ok());
  }

  #[test]
  fn patch_updates_and_clears() {
    let mut input = NewMember::new("Jean", "Mballa", Gender::Male);
    input.profession = Some("Instituteur".into());
    let mut member = input.into_member(Uuid::new_v4(), Matricule::FIRST, Utc::now());

    member.apply(MemberPatch {
      last_name: Some("Essomba".into()),
      profession: Some(String::new()),
      situation: Some(MemberSituation::Transferred),
      ..MemberPatch::default()
    });

    assert_eq!(member.last_name, "Essomba");
    assert_eq!(member.profession, None);
    assert_eq!(member.situation, MemberSituation::Transferred);
    assert_eq!(member.first_name, "Jean");
  }

  #[test]
  fn enums_round_trip_through_strum() {
    assert_eq!(MemberSituation::Transferred.as_ref(), "transferred");
    assert_eq!("catechumen".parse::<MembershipStatus>().unwrap(), MembershipStatus::Catechumen);
    assert!("unknown".parse::<Gender>().is_err());
  }
}
