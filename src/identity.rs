//! Signed-in user, supplied by an injected identity provider.
//!
//! Authentication itself lives elsewhere; the pipeline only needs to know
//! whose scene it is producing.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Account tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free tier.
    #[default]
    Amateur,
    /// Paid tier.
    Pro,
}

/// A user profile as the identity provider reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Stable user id, stamped onto scenes as `userId`.
    pub uid: String,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar URL.
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Account tier.
    #[serde(default)]
    pub tier: Tier,
    /// RFC 3339 sign-up timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl UserProfile {
    /// Creates a profile with just a uid.
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            photo_url: None,
            tier: Tier::default(),
            created_at: None,
        }
    }

    /// The built-in development identity.
    pub fn development() -> Self {
        Self {
            uid: "mock-user-123".into(),
            email: Some("user@example.com".into()),
            display_name: Some("Mock User".into()),
            photo_url: Some("https://placehold.co/100x100.png".into()),
            tier: Tier::Pro,
            created_at: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }

    /// Sets the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the tier.
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }
}

/// Supplies the current user, if any.
pub trait IdentityProvider: Send + Sync {
    /// Returns the signed-in user, or `None` when anonymous.
    fn current_user(&self) -> Option<UserProfile>;

    /// Shorthand for the current user's id.
    fn user_id(&self) -> Option<String> {
        self.current_user().map(|u| u.uid)
    }
}

/// No one is signed in. Scenes carry no `userId`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousIdentity;

impl IdentityProvider for AnonymousIdentity {
    fn current_user(&self) -> Option<UserProfile> {
        None
    }
}

/// Always the same user.
#[derive(Debug, Clone)]
pub struct FixedIdentity {
    user: UserProfile,
}

impl FixedIdentity {
    /// Signs in as `user`.
    pub fn new(user: UserProfile) -> Self {
        Self { user }
    }
}

impl Default for FixedIdentity {
    fn default() -> Self {
        Self::new(UserProfile::development())
    }
}

impl IdentityProvider for FixedIdentity {
    fn current_user(&self) -> Option<UserProfile> {
        Some(self.user.clone())
    }
}
