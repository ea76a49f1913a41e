//! Admin gating for the offramp review routes.
//!
//! The upstream auth proxy forwards the signed-in user's e-mail in the
//! `x-admin-email` header; only addresses on the allowlist get through.

use std::collections::HashSet;

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use durian_common::DurianError;

use crate::{ApiError, AppState};

/// Header carrying the authenticated admin's e-mail.
pub const ADMIN_EMAIL_HEADER: &str = "x-admin-email";

/// Case-insensitive set of admin e-mail addresses.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
}

impl AdminAllowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| email.as_ref().trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    /// Check if the address is an admin.
    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}

/// Extractor for an allowlisted admin. Holds the normalised e-mail, which is
/// recorded as `fulfilled_by`.
#[derive(Debug, Clone)]
pub struct AdminUser(pub String);

impl AdminUser {
    pub fn email(&self) -> &str {
        &self.0
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get(ADMIN_EMAIL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_lowercase())
            .filter(|value| !value.is_empty());

        match email {
            Some(email) if state.admins.contains(&email) => Ok(AdminUser(email)),
            other => {
                state.metrics.admin_rejected();
                warn!(
                    email = other.as_deref().unwrap_or("<missing>"),
                    path = %parts.uri.path(),
                    "Admin access denied"
                );
                Err(DurianError::Forbidden("Admin access required".to_string()).into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowlist_is_case_insensitive() {
        let admins = AdminAllowlist::new(["Ops@Durian.cash", " ", "finance@durian.cash "]);

        assert_eq!(admins.len(), 2);
        assert!(admins.contains("ops@durian.cash"));
        assert!(admins.contains(" FINANCE@durian.cash"));
        assert!(!admins.contains("guest@durian.cash"));
        assert!(AdminAllowlist::default().is_empty());
    }
}
