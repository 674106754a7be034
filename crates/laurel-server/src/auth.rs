//! HTTP Basic-auth extractor and standalone verifier.
//!
//! A verified account becomes the [`Caller`] handed to the lifecycle engine.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use laurel_core::{
  caller::{Caller, Role},
  store::{ContentStore, ReferenceStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, error::Error};

/// One login accepted by this server instance.
#[derive(Clone, Deserialize)]
pub struct Account {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub user_id:       Uuid,
  pub role:          Role,
}

#[derive(Clone, Default)]
pub struct AuthConfig {
  pub accounts: Vec<Account>,
}

impl AuthConfig {
  fn account(&self, username: &str) -> Option<&Account> {
    self.accounts.iter().find(|a| a.username == username)
  }
}

/// The verified caller of the current request.
pub struct Authenticated(pub Caller);

/// Verify credentials directly from headers.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<Caller, Error> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(Error::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| Error::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| Error::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(Error::Unauthorized)?;

  let account = config.account(username).ok_or(Error::Unauthorized)?;

  let parsed_hash = PasswordHash::new(&account.password_hash)
    .map_err(|_| Error::Unauthorized)?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| Error::Unauthorized)?;

  Ok(Caller { user_id: account.user_id, role: account.role })
}

impl<C, R> FromRequestParts<AppState<C, R>> for Authenticated
where
  C: ContentStore + 'static,
  R: ReferenceStore + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<C, R>,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth).map(Authenticated)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::{HeaderValue, header};

  fn config(password: &str) -> (AuthConfig, Uuid) {
    use argon2::{PasswordHasher, password_hash::SaltString};
    use rand_core::OsRng;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();

    let user_id = Uuid::new_v4();
    let accounts = vec![
      Account {
        username:      "alice".to_string(),
        password_hash: hash.clone(),
        user_id,
        role:          Role::Student,
      },
      Account {
        username:      "rita".to_string(),
        password_hash: hash,
        user_id:       Uuid::new_v4(),
        role:          Role::Reviewer,
      },
    ];
    (AuthConfig { accounts }, user_id)
  }

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  fn basic(user: &str, pass: &str) -> String {
    let encoded = B64.encode(format!("{user}:{pass}"));
    format!("Basic {encoded}")
  }

  #[test]
  fn correct_credentials_yield_the_account_caller() {
    let (config, alice) = config("secret");
    let caller = verify_auth(&headers(&basic("alice", "secret")), &config).unwrap();
    assert_eq!(caller.user_id, alice);
    assert_eq!(caller.role, Role::Student);

    let reviewer = verify_auth(&headers(&basic("rita", "secret")), &config).unwrap();
    assert!(reviewer.has_reviewer_authority());
  }

  #[test]
  fn wrong_password() {
    let (config, _) = config("secret");
    let result = verify_auth(&headers(&basic("alice", "wrong")), &config);
    assert!(matches!(result, Err(Error::Unauthorized)));
  }

  #[test]
  fn unknown_user() {
    let (config, _) = config("secret");
    let result = verify_auth(&headers(&basic("mallory", "secret")), &config);
    assert!(matches!(result, Err(Error::Unauthorized)));
  }

  #[test]
  fn missing_header() {
    let (config, _) = config("secret");
    assert!(matches!(verify_auth(&HeaderMap::new(), &config), Err(Error::Unauthorized)));
  }

  #[test]
  fn invalid_base64() {
    let (config, _) = config("secret");
    let result = verify_auth(&headers("Basic !!!not-base64!!!"), &config);
    assert!(matches!(result, Err(Error::Unauthorized)));
  }
}
