use chrono::{DateTime, Utc};

pub const DEFAULT_PROFILE_NAME: &str = "Default";
pub const DEFAULT_PROFILE_COLOR: &str = "#6366f1";
pub const DEFAULT_PROFILE_ICON: &str = "user";

/// A named grouping bets can be tagged with.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-side description of a profile. `id: None` creates one.
#[derive(Debug, Clone, Default)]
pub struct ProfileDraft {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl ProfileDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            id: Some(profile.id),
            name: profile.name.clone(),
            description: profile.description.clone(),
            color: Some(profile.color.clone()),
            icon: Some(profile.icon.clone()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("profile name must not be empty".into());
        }
        Ok(())
    }

    /// Build the stored record, keeping `id` and `created_at` from the caller.
    pub fn into_profile(self, id: i64, created_at: DateTime<Utc>) -> Profile {
        Profile {
            id,
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            color: self
                .color
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PROFILE_COLOR.into()),
            icon: self
                .icon
                .filter(|i| !i.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PROFILE_ICON.into()),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        assert!(ProfileDraft::new("   ").validate().is_err());
        assert!(ProfileDraft::new("Main").validate().is_ok());
    }

    #[test]
    fn test_defaults_fill_display_tokens() {
        let profile = ProfileDraft::new(" Main ").into_profile(7, Utc::now());
        assert_eq!(profile.id, 7);
        assert_eq!(profile.name, "Main");
        assert_eq!(profile.description, "");
        assert_eq!(profile.color, DEFAULT_PROFILE_COLOR);
        assert_eq!(profile.icon, DEFAULT_PROFILE_ICON);
    }
}
