//! User identity types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claims carried in the payload of the backend's bearer token.
///
/// Only `sub` is guaranteed; everything the backend adds beyond the fields
/// below is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the user's email for this backend).
    pub sub: String,
    /// Role granted to the user, if the backend includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Expiry as epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued-at as epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Any other claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Whether the claims carry an expiry that lies strictly before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp.is_some_and(|exp| exp < now)
    }
}

/// Account details returned by `GET /api/user/userinfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub mobile: Option<String>,
    pub alt_mobile: Option<String>,
    pub dob: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    /// First and last name joined, or `None` when neither is set.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect();

        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_keep_unknown_fields() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "sub": "asha@example.com",
            "role": "USER",
            "exp": 1_700_000_000,
            "tenant": "in"
        }))
        .unwrap();

        assert_eq!(claims.role.as_deref(), Some("USER"));
        assert_eq!(claims.extra.get("tenant"), Some(&Value::from("in")));
    }

    #[test]
    fn test_claims_expiry() {
        let claims: Claims =
            serde_json::from_value(serde_json::json!({ "sub": "a", "exp": 100 })).unwrap();
        assert!(claims.is_expired_at(101));
        assert!(!claims.is_expired_at(100));

        let no_exp: Claims = serde_json::from_value(serde_json::json!({ "sub": "a" })).unwrap();
        assert!(!no_exp.is_expired_at(i64::MAX));
    }

    #[test]
    fn test_profile_full_name() {
        let profile = UserProfile {
            first_name: Some("Asha".to_string()),
            last_name: Some("Rao".to_string()),
            ..UserProfile::default()
        };
        assert_eq!(profile.full_name().as_deref(), Some("Asha Rao"));
        assert_eq!(UserProfile::default().full_name(), None);
    }
}
