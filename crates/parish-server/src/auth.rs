//! HTTP Basic authentication and role checks.

use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, Method},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::Deserialize;

use crate::error::Error;

/// What a request needs to be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
  Read,
  Write,
  Delete,
}

impl Permission {
  pub fn for_method(method: &Method) -> Self {
    match *method {
      Method::GET | Method::HEAD | Method::OPTIONS => Self::Read,
      Method::DELETE => Self::Delete,
      _ => Self::Write,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  Treasurer,
  Viewer,
}

impl Role {
  pub fn allows(self, permission: Permission) -> bool {
    match self {
      Role::Admin => true,
      Role::Treasurer => permission != Permission::Delete,
      Role::Viewer => permission == Permission::Read,
    }
  }
}

/// One account allowed to use the API.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub role:          Role,
}

/// Credentials accepted as valid for this server instance.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
  pub users: Vec<UserConfig>,
}

/// Inserted into request extensions once a caller has been let through.
#[derive(Debug, Clone)]
pub struct Authenticated {
  pub username: String,
  pub role:     Role,
}

/// Check the `Authorization` header against the configured users.
pub fn verify_auth<'a>(headers: &HeaderMap, config: &'a AuthConfig) -> Result<&'a UserConfig, Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val.strip_prefix("Basic ").ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let user = config
    .users
    .iter()
    .find(|u| u.username == username)
    .ok_or(Error::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&user.password_hash).map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(user)
}

/// Middleware guarding every API route.
pub async fn require_auth(
  State(config): State<Arc<AuthConfig>>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let user = verify_auth(req.headers(), &config)?;
  let needed = Permission::for_method(req.method());
  if !user.role.allows(needed) {
    tracing::info!(username = %user.username, method = %req.method(), "permission denied");
    return Err(Error::Forbidden {
      username: user.username.clone(),
      method:   req.method().to_string(),
    });
  }

  let caller = Authenticated { username: user.username.clone(), role: user.role };
  req.extensions_mut().insert(caller);
  Ok(next.run(req).await)
}

#[cfg(test)]
pub(crate) mod tests {
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::http::{Request, header};
  use rand_core::OsRng;

  use super::*;

  pub(crate) fn hash(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string()
  }

  pub(crate) fn basic(user: &str, pass: &str) -> String {
    let encoded = B64.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
  }

  fn config() -> AuthConfig {
    AuthConfig {
      users: vec![
        UserConfig { username: "admin".into(), password_hash: hash("secret"), role: Role::Admin },
        UserConfig { username: "lecteur".into(), password_hash: hash("lire"), role: Role::Viewer },
      ],
    }
  }

  fn headers(value: &str) -> HeaderMap {
    let req = Request::builder()
      .header(header::AUTHORIZATION, value)
      .body(())
      .unwrap();
    req.headers().clone()
  }

  #[test]
  fn correct_credentials_pick_the_user() {
    let config = config();
    let user = verify_auth(&headers(&basic("lecteur", "lire")), &config).unwrap();
    assert_eq!(user.role, Role::Viewer);
  }

  #[test]
  fn wrong_password() {
    let config = config();
    assert!(matches!(
      verify_auth(&headers(&basic("admin", "wrong")), &config),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn unknown_user() {
    let config = config();
    assert!(matches!(
      verify_auth(&headers(&basic("ghost", "secret")), &config),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn missing_header() {
    assert!(matches!(verify_auth(&HeaderMap::new(), &config()), Err(Error::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    assert!(matches!(
      verify_auth(&headers("Basic !!!not-base64!!!"), &config()),
      Err(Error::Unauthorized)
    ));
  }

  #[test]
  fn role_permissions() {
    use Permission::*;
    assert!(Role::Admin.allows(Delete));
    assert!(Role::Treasurer.allows(Write));
    assert!(!Role::Treasurer.allows(Delete));
    assert!(Role::Viewer.allows(Read));
    assert!(!Role::Viewer.allows(Write));
    assert_eq!(Permission::for_method(&Method::PATCH), Write);
    assert_eq!(Permission::for_method(&Method::DELETE), Delete);
  }
}
