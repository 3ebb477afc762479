//! User settings domain types
//!
//! Interface theme and display profile.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Interface theme
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    #[default]
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dark" => Ok(Self::Dark),
            "light" => Ok(Self::Light),
            other => Err(format!("unknown theme: {}", other)),
        }
    }
}

/// Display profile, kept in memory only
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    /// Avatar image as a data URL
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: "Project Manager".to_string(),
            avatar: None,
        }
    }
}

/// Request DTO for updating settings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub name: Option<String>,
    /// `Some(None)` clears the avatar
    #[serde(default, deserialize_with = "double_option")]
    pub avatar: Option<Option<String>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Response DTO for settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub theme: Theme,
    pub profile: UserProfile,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_parse() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert_eq!(" light ".parse::<Theme>().unwrap(), Theme::Light);
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn test_update_request_avatar_states() {
        let req: UpdateSettingsRequest = serde_json::from_str(r#"{"name":"Ana"}"#).unwrap();
        assert!(req.avatar.is_none());

        let req: UpdateSettingsRequest = serde_json::from_str(r#"{"avatar":null}"#).unwrap();
        assert_eq!(req.avatar, Some(None));

        let req: UpdateSettingsRequest =
            serde_json::from_str(r#"{"theme":"dark","avatar":"data:image/png;base64,AA=="}"#)
                .unwrap();
        assert_eq!(req.theme, Some(Theme::Dark));
        assert_eq!(req.avatar, Some(Some("data:image/png;base64,AA==".to_string())));
    }
}
