//! Sentry context for client activity.
//!
//! Sentry is only bound when the host binary initializes it; until then
//! these calls do nothing.

use serde_json::Value;

/// Tag subsequent events with the signed-in account.
///
/// `subject` is the token's `sub` claim.
pub fn set_sentry_user(subject: &str, email: Option<&str>) {
    let user = sentry::User {
        id: Some(subject.to_owned()),
        email: email.map(str::to_owned),
        ..Default::default()
    };
    sentry::configure_scope(|scope| scope.set_user(Some(user)));
}

/// Stop tagging events with an account after sign-out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| scope.set_user(None));
}

/// Record a cart or session step so a later error report shows what led to it.
///
/// ```rust
/// sdcart_client::telemetry::add_breadcrumb("cart", "Removed item", Some(&[("item_id", "7")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let data = data
        .unwrap_or_default()
        .iter()
        .map(|&(key, value)| (key.to_owned(), Value::from(value)))
        .collect();

    sentry::add_breadcrumb(sentry::Breadcrumb {
        category: Some(category.to_owned()),
        message: Some(message.to_owned()),
        level: sentry::Level::Info,
        data,
        ..Default::default()
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_without_client_are_noops() {
        set_sentry_user("asha@example.com", Some("asha@example.com"));
        add_breadcrumb("cart", "Cleared cart", None);
        add_breadcrumb("auth", "Signed in", Some(&[("subject", "asha@example.com")]));
        clear_sentry_user();
    }
}
