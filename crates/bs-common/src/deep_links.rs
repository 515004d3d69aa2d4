use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};
use uuid::Uuid;

pub const DEFAULT_MESSAGE: &str = "Hey! I found you through BITSPARK - the BITS student platform. Let's continue our conversation here!";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Platform {
    Whatsapp,
    Instagram,
    Telegram,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn instructions(&self) -> &'static str {
        match self {
            Platform::Whatsapp => "Share your WhatsApp number to continue chatting",
            Platform::Instagram => "Share your Instagram handle to connect",
            Platform::Telegram => "Share your Telegram username to continue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLink {
    pub platform: Platform,
    pub url: String,
    pub instructions: String,
}

/// One row per (connection, platform); `redirect_count` grows on every invite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRedirection {
    pub id: Uuid,
    pub connection_id: Uuid,
    pub platform: Platform,
    pub redirect_count: i64,
    pub last_redirect_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLinkConfig {
    pub whatsapp_base: String,
    pub instagram_base: String,
    pub telegram_base: String,
}

impl Default for DeepLinkConfig {
    fn default() -> Self {
        Self {
            whatsapp_base: "https://wa.me".into(),
            instagram_base: "https://instagram.com".into(),
            telegram_base: "https://t.me".into(),
        }
    }
}

impl DeepLinkConfig {
    /// Base URLs from `BS_WHATSAPP_REDIRECT_URL`, `BS_INSTAGRAM_REDIRECT_URL` and
    /// `BS_TELEGRAM_REDIRECT_URL`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: String| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };
        Self {
            whatsapp_base: read("BS_WHATSAPP_REDIRECT_URL", defaults.whatsapp_base),
            instagram_base: read("BS_INSTAGRAM_REDIRECT_URL", defaults.instagram_base),
            telegram_base: read("BS_TELEGRAM_REDIRECT_URL", defaults.telegram_base),
        }
    }

    /// Builds the outbound link. WhatsApp handles are reduced to digits; Instagram
    /// links never carry a message.
    pub fn link(&self, platform: Platform, handle: Option<&str>, message: Option<&str>) -> DeepLink {
        let message = message
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MESSAGE);
        let handle = handle.map(str::trim).filter(|h| !h.is_empty());

        let url = match platform {
            Platform::Whatsapp => {
                let mut url = self.whatsapp_base.clone();
                if let Some(number) = handle {
                    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
                    url.push('/');
                    url.push_str(&digits);
                }
                format!("{url}?text={}", urlencoding::encode(message))
            }
            Platform::Instagram => match handle {
                Some(handle) => format!(
                    "{}/{}",
                    self.instagram_base,
                    urlencoding::encode(handle.trim_start_matches('@'))
                ),
                None => self.instagram_base.clone(),
            },
            Platform::Telegram => {
                let mut url = self.telegram_base.clone();
                if let Some(handle) = handle {
                    url.push('/');
                    url.push_str(&urlencoding::encode(handle.trim_start_matches('@')));
                }
                format!("{url}?text={}", urlencoding::encode(message))
            }
        };

        DeepLink {
            platform,
            url,
            instructions: platform.instructions().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whatsapp_keeps_digits_and_encodes_message() {
        let link = DeepLinkConfig::default().link(
            Platform::Whatsapp,
            Some("+91 98765-43210"),
            Some("hi there & bye"),
        );
        assert_eq!(link.url, "https://wa.me/919876543210?text=hi%20there%20%26%20bye");
    }

    #[test]
    fn instagram_has_no_message() {
        let config = DeepLinkConfig::default();
        assert_eq!(
            config.link(Platform::Instagram, Some("@spark"), Some("x")).url,
            "https://instagram.com/spark"
        );
        assert_eq!(
            config.link(Platform::Instagram, None, None).url,
            "https://instagram.com"
        );
    }

    #[test]
    fn telegram_uses_default_message() {
        let link = DeepLinkConfig::default().link(Platform::Telegram, Some("spark_bot"), None);
        assert!(link.url.starts_with("https://t.me/spark_bot?text=Hey%21"));
        assert_eq!(link.instructions, Platform::Telegram.instructions());
    }
}
