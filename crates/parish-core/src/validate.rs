//! Field checks shared by the `New*` / `*Patch` input types.

use rust_decimal::Decimal;

use crate::{Error, Result};

/// Lowest and highest calendar year a commitment may be recorded for.
pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

pub(crate) fn length(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
  let len = value.trim().chars().count();
  if len < min {
    return Err(Error::invalid(format!("{field} must be at least {min} characters")));
  }
  if len > max {
    return Err(Error::invalid(format!("{field} must be at most {max} characters")));
  }
  Ok(())
}

pub(crate) fn optional_length(field: &str, value: Option<&str>, max: usize) -> Result<()> {
  match value {
    Some(v) => length(field, v, 0, max),
    None => Ok(()),
  }
}

/// Largest single amount accepted anywhere: one trillion.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// Most decimal places an amount may carry.
pub const AMOUNT_DP: u32 = 2;

fn bounded(field: &str, amount: Decimal) -> Result<()> {
  if amount > MAX_AMOUNT {
    return Err(Error::invalid(format!("{field} must be at most {MAX_AMOUNT} (got {amount})")));
  }
  if amount.normalize().scale() > AMOUNT_DP {
    return Err(Error::invalid(format!(
      "{field} must have at most {AMOUNT_DP} decimal places (got {amount})"
    )));
  }
  Ok(())
}

pub(crate) fn non_negative(field: &str, amount: Decimal) -> Result<()> {
  if amount < Decimal::ZERO {
    return Err(Error::invalid(format!("{field} must not be negative (got {amount})")));
  }
  bounded(field, amount)
}

pub(crate) fn positive(field: &str, amount: Decimal) -> Result<()> {
  if amount <= Decimal::ZERO {
    return Err(Error::invalid(format!("{field} must be greater than zero (got {amount})")));
  }
  bounded(field, amount)
}

pub(crate) fn year(year: i32) -> Result<()> {
  if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
    return Err(Error::invalid(format!("year {year} is outside {MIN_YEAR}..={MAX_YEAR}")));
  }
  Ok(())
}

/// Loose shape check: one `@`, non-empty local part, dotted domain.
pub(crate) fn email(value: &str) -> Result<()> {
  let ok = value.split_once('@').is_some_and(|(local, domain)| {
    !local.is_empty()
      && !domain.contains('@')
      && domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
  });
  if ok { Ok(()) } else { Err(Error::invalid(format!("invalid email address {value:?}"))) }
}

/// Cameroonian mobile or landline: optional `+237`/`237` prefix then nine
/// digits starting with 6–9.
pub(crate) fn phone(value: &str) -> Result<()> {
  let local = value
    .strip_prefix("+237")
    .or_else(|| value.strip_prefix("237"))
    .unwrap_or(value);
  let ok = local.len() == 9
    && local.bytes().all(|b| b.is_ascii_digit())
    && matches!(local.as_bytes()[0], b'6'..=b'9');
  if ok { Ok(()) } else { Err(Error::invalid(format!("invalid phone number {value:?}"))) }
}

#[cfg(test)]
mod tests {
  use rust_decimal_macros::dec;

  use super::*;

  #[test]
  fn phone_formats() {
    assert!(phone("677123456").is_ok());
    assert!(phone("+237677123456").is_ok());
    assert!(phone("237699000111").is_ok());
    assert!(phone("577123456").is_err());
    assert!(phone("67712345").is_err());
    assert!(phone("+33677123456").is_err());
  }

  #[test]
  fn email_shape() {
    assert!(email("jean@paroisse.cm").is_ok());
    assert!(email("jean@paroisse").is_err());
    assert!(email("@paroisse.cm").is_err());
    assert!(email("jean@@paroisse.cm").is_err());
  }

  #[test]
  fn amounts() {
    assert!(non_negative("tithe", dec!(0)).is_ok());
    assert!(non_negative("tithe", dec!(-0.01)).is_err());
    assert!(positive("amount", dec!(0)).is_err());
    assert!(positive("amount", dec!(1)).is_ok());
  }

  #[test]
  fn amounts_are_capped() {
    assert_eq!(MAX_AMOUNT, dec!(1_000_000_000_000));
    assert!(positive("amount", MAX_AMOUNT).is_ok());
    assert!(positive("amount", MAX_AMOUNT + dec!(0.01)).is_err());
    assert!(non_negative("debt", Decimal::MAX).is_err());
    assert!(positive("amount", dec!(12.50)).is_ok());
    assert!(positive("amount", dec!(12.500)).is_ok());
    assert!(positive("amount", dec!(0.005)).is_err());
  }

  #[test]
  fn year_bounds() {
    assert!(year(2000).is_ok());
    assert!(year(2100).is_ok());
    assert!(year(1999).is_err());
    assert!(year(2101).is_err());
  }
}
