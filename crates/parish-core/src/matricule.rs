//! The sequential member identifier.
//!
//! A matricule reads `NNN-LL`: a zero-padded counter `000..=999` followed by
//! two lowercase letters `aa..=zz`. It is a mixed-radix number with one
//! base-1000 digit (the counter, least significant) and two base-26 digits
//! (the letters). Allocation walks that number upwards one step at a time and
//! refuses to wrap once `999-zz` has been issued.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Radix of the counter digit.
pub const COUNTER_RADIX: u32 = 1000;
/// Radix of each letter digit.
pub const LETTER_RADIX: u32 = 26;
/// Number of distinct matricules.
pub const CAPACITY: u32 = COUNTER_RADIX * LETTER_RADIX * LETTER_RADIX;

const MAX_COUNTER: u16 = 999;
const MAX_LETTER: u8 = 25;

/// A parsed member identifier.
///
/// Field order matters: the derived `Ord` compares the high letter, then the
/// low letter, then the counter, which is exactly allocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Matricule {
  high:    u8,
  low:     u8,
  counter: u16,
}

impl Matricule {
  /// The first identifier ever issued.
  pub const FIRST: Self = Self { high: 0, low: 0, counter: 0 };
  /// The last identifier the allocator can produce.
  pub const LAST: Self = Self { high: MAX_LETTER, low: MAX_LETTER, counter: MAX_COUNTER };

  /// Build a matricule from its digits. Letters are `0..=25` for `a..=z`.
  pub fn new(counter: u16, high: u8, low: u8) -> Result<Self> {
    if counter > MAX_COUNTER || high > MAX_LETTER || low > MAX_LETTER {
      return Err(Error::MalformedMatricule(format!("{counter}/{high}/{low}")));
    }
    Ok(Self { high, low, counter })
  }

  pub fn counter(&self) -> u16 { self.counter }

  pub fn letters(&self) -> [char; 2] { [letter(self.high), letter(self.low)] }

  /// Zero-based position in allocation order, `0..CAPACITY`.
  pub fn ordinal(&self) -> u32 {
    (u32::from(self.high) * LETTER_RADIX + u32::from(self.low)) * COUNTER_RADIX
      + u32::from(self.counter)
  }

  pub fn from_ordinal(ordinal: u32) -> Result<Self> {
    if ordinal >= CAPACITY {
      return Err(Error::CapacityExhausted);
    }
    let counter = (ordinal % COUNTER_RADIX) as u16;
    let letters = ordinal / COUNTER_RADIX;
    Ok(Self {
      high: (letters / LETTER_RADIX) as u8,
      low: (letters % LETTER_RADIX) as u8,
      counter,
    })
  }

  /// The identifier that follows `self`.
  ///
  /// Carry chain: the counter overflows into the low letter, the low letter
  /// into the high letter, and a high-letter overflow is
  /// [`Error::CapacityExhausted`].
  pub fn next(&self) -> Result<Self> {
    let mut counter = self.counter + 1;
    let mut low = self.low;
    let mut high = self.high;

    if counter > MAX_COUNTER {
      counter = 0;
      low += 1;

      if low > MAX_LETTER {
        low = 0;
        high += 1;

        if high > MAX_LETTER {
          return Err(Error::CapacityExhausted);
        }
      }
    }

    Ok(Self { high, low, counter })
  }
}

/// Derive the next identifier from the last one issued.
///
/// `None` means nothing has been issued yet. Reading the true last value and
/// inserting the result atomically is the caller's job.
pub fn allocate_next(last_issued: Option<&Matricule>) -> Result<Matricule> {
  match last_issued {
    None => Ok(Matricule::FIRST),
    Some(last) => last.next(),
  }
}

fn letter(digit: u8) -> char { char::from(b'a' + digit) }

// ─── Text form ───────────────────────────────────────────────────────────────

impl fmt::Display for Matricule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let [a, b] = self.letters();
    write!(f, "{:03}-{a}{b}", self.counter)
  }
}

/// Parses `NNN-LL`. Letters are accepted in either case and normalised to
/// lowercase; anything else of the wrong shape is rejected.
impl FromStr for Matricule {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let malformed = || Error::MalformedMatricule(s.to_owned());
    let bytes = s.as_bytes();

    if bytes.len() != 6 || bytes[3] != b'-' {
      return Err(malformed());
    }

    let digits = &bytes[..3];
    if !digits.iter().all(u8::is_ascii_digit) {
      return Err(malformed());
    }
    let counter = digits
      .iter()
      .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));

    let mut letters = [0u8; 2];
    for (slot, raw) in letters.iter_mut().zip(&bytes[4..]) {
      if !raw.is_ascii_alphabetic() {
        return Err(malformed());
      }
      *slot = raw.to_ascii_lowercase() - b'a';
    }

    Ok(Self { high: letters[0], low: letters[1], counter })
  }
}

impl TryFrom<String> for Matricule {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<Matricule> for String {
  fn from(m: Matricule) -> Self { m.to_string() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn m(s: &str) -> Matricule { s.parse().unwrap() }

  #[test]
  fn first_allocation_is_000_aa() {
    assert_eq!(allocate_next(None).unwrap().to_string(), "000-aa");
  }

  #[test]
  fn counter_increments() {
    assert_eq!(allocate_next(Some(&m("005-aa"))).unwrap().to_string(), "006-aa");
    assert_eq!(allocate_next(Some(&m("099-bq"))).unwrap().to_string(), "100-bq");
  }

  #[test]
  fn counter_overflow_carries_into_low_letter() {
    assert_eq!(allocate_next(Some(&m("999-aa"))).unwrap().to_string(), "000-ab");
  }

  #[test]
  fn low_letter_overflow_carries_into_high_letter() {
    assert_eq!(allocate_next(Some(&m("999-az"))).unwrap().to_string(), "000-ba");
  }

  #[test]
  fn letters_only_move_on_counter_overflow() {
    assert_eq!(allocate_next(Some(&m("000-az"))).unwrap().to_string(), "001-az");
  }

  #[test]
  fn last_matricule_exhausts_capacity() {
    assert_eq!(Matricule::LAST.to_string(), "999-zz");
    assert!(matches!(
      allocate_next(Some(&m("999-zz"))),
      Err(Error::CapacityExhausted)
    ));
  }

  #[test]
  fn next_is_strictly_greater_and_one_ordinal_apart() {
    for s in ["000-aa", "998-aa", "999-aa", "999-az", "517-mq", "999-yz", "998-zz"] {
      let cur = m(s);
      let next = cur.next().unwrap();
      assert!(next > cur, "{next} should follow {cur}");
      assert_eq!(next.ordinal(), cur.ordinal() + 1);
      assert_eq!(next, cur.next().unwrap());
    }
  }

  #[test]
  fn ordinal_bounds() {
    assert_eq!(Matricule::FIRST.ordinal(), 0);
    assert_eq!(Matricule::LAST.ordinal(), CAPACITY - 1);
    assert_eq!(Matricule::from_ordinal(1000).unwrap().to_string(), "000-ab");
    assert_eq!(Matricule::from_ordinal(26_000).unwrap().to_string(), "000-ba");
    assert!(matches!(
      Matricule::from_ordinal(CAPACITY),
      Err(Error::CapacityExhausted)
    ));
  }

  #[test]
  fn ordering_is_letters_then_counter() {
    assert!(m("999-aa") < m("000-ab"));
    assert!(m("999-az") < m("000-ba"));
    assert!(m("001-aa") < m("002-aa"));
  }

  #[test]
  fn parse_normalises_case() {
    assert_eq!(m("042-BC").to_string(), "042-bc");
  }

  #[test]
  fn malformed_input_is_rejected() {
    for bad in ["", "00-aa", "0000-aa", "000aa", "000_aa", "abc-aa", "000-a1", "000-aaa", "-12-aa", "000-éa"] {
      assert!(
        matches!(bad.parse::<Matricule>(), Err(Error::MalformedMatricule(_))),
        "{bad:?} should be rejected"
      );
    }
  }

  #[test]
  fn new_rejects_out_of_range_digits() {
    assert!(Matricule::new(1000, 0, 0).is_err());
    assert!(Matricule::new(0, 26, 0).is_err());
    assert_eq!(Matricule::new(7, 1, 2).unwrap().to_string(), "007-bc");
  }

  #[test]
  fn serde_uses_text_form() {
    let json = serde_json::to_string(&m("123-xy")).unwrap();
    assert_eq!(json, "\"123-xy\"");
    let back: Matricule = serde_json::from_str(&json).unwrap();
    assert_eq!(back, m("123-xy"));
    assert!(serde_json::from_str::<Matricule>("\"nope\"").is_err());
  }
}
