use std::cell::RefCell;
use std::collections::HashMap;

use log::warn;

/// Site-wide constants. Every field can be overridden from the page through
/// `set_site_options`.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    pub embed_base: String,
    pub base_path: String,
    pub error_storage_key: String,
    pub invalid_parameter_message: String,
    pub instruction_message: String,
    pub empty_placeholder: String,
    pub footer_owner: String,
    pub favicon_emoji: String,
    pub sync_delay_ms: i32,
    pub banner_duration_ms: i32,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            embed_base: "https://www.youtube.com/embed/".to_string(),
            base_path: "/".to_string(),
            error_storage_key: "errorMessage".to_string(),
            invalid_parameter_message: "無効なパラメータです".to_string(),
            instruction_message: "※タイムスタンプを選択すると説明が表示されます。".to_string(),
            empty_placeholder: "（タイムスタンプなし）".to_string(),
            footer_owner: "ちこい".to_string(),
            favicon_emoji: "🐮".to_string(),
            sync_delay_ms: 100,
            banner_duration_ms: 5000,
        }
    }
}

impl SiteConfig {
    /// Applies one option by its JS-side name. Returns false for unknown keys
    /// and for values that do not parse.
    pub fn apply_option(&mut self, key: &str, value: &str) -> bool {
        match key {
            "embedBase" => self.embed_base = value.to_string(),
            "basePath" => self.base_path = normalize_base_path(value),
            "errorStorageKey" => self.error_storage_key = value.to_string(),
            "invalidParameterMessage" => self.invalid_parameter_message = value.to_string(),
            "instructionMessage" => self.instruction_message = value.to_string(),
            "emptyPlaceholder" => self.empty_placeholder = value.to_string(),
            "footerOwner" => self.footer_owner = value.to_string(),
            "faviconEmoji" => self.favicon_emoji = value.to_string(),
            "syncDelayMs" => match value.parse() {
                Ok(delay) => self.sync_delay_ms = delay,
                Err(_) => return false,
            },
            "bannerDurationMs" => match value.parse() {
                Ok(duration) => self.banner_duration_ms = duration,
                Err(_) => return false,
            },
            _ => return false,
        }
        true
    }

    pub fn apply_options(&mut self, options: &HashMap<String, String>) {
        for (key, value) in options {
            if !self.apply_option(key, value) {
                warn!("Ignoring site option {}={:?}", key, value);
            }
        }
    }
}

fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

thread_local! {
    static SITE_CONFIG: RefCell<SiteConfig> = RefCell::new(SiteConfig::default());
}

pub fn site_config() -> SiteConfig {
    SITE_CONFIG.with(|config| config.borrow().clone())
}

pub fn update_site_config(options: &HashMap<String, String>) {
    SITE_CONFIG.with(|config| config.borrow_mut().apply_options(options));
}
