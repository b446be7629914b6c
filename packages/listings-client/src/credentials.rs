//! Account credentials for the listings provider.
//!
//! The password is held in a `secrecy::SecretBox` so it never ends up in
//! logs, debug output, or error messages.

use secrecy::{ExposeSecret, SecretBox};
use std::fmt;

/// Password that redacts itself in `Debug` and `Display`.
pub struct Password(SecretBox<str>);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretBox::new(value.into().into_boxed_str()))
    }

    /// Only call this when building the token issuance request.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for Password {
    fn clone(&self) -> Self {
        Self::new(self.expose())
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Username/password pair used to obtain the account-level token.
///
/// Either half may be absent at load time; the session reports
/// `CredentialsMissing` the first time it actually needs them.
#[derive(Clone, Default)]
pub struct AccountCredentials {
    pub username: Option<String>,
    pub password: Option<Password>,
}

impl AccountCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(Password::new(password)),
        }
    }

    /// Both halves, if both are present and non-empty.
    pub fn complete(&self) -> Option<(&str, &Password)> {
        match (self.username.as_deref(), self.password.as_ref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.expose().is_empty() => {
                Some((user, pass))
            }
            _ => None,
        }
    }
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
