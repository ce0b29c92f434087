use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};

use crate::engine::watch::WatchConfig;
use crate::surface::Rgba;
use crate::types::MatrixContract;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Time between frames.
    pub frame_interval_ms: u64,
    /// How often the scene file is checked for changes.
    pub poll_interval_ms: u64,
    /// Size of the emulated LED matrix, in pixels.
    pub matrix_width: u16,
    pub matrix_height: u16,
    /// Color the canvas is cleared to before every frame.
    pub background: String,
    pub key_bindings: KeyBindings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub quit: String,
    pub quit_alt: String,
    pub restart: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            quit: "q".into(),
            quit_alt: "Esc".into(),
            restart: "r".into(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            frame_interval_ms: 50,
            poll_interval_ms: 250,
            matrix_width: 64,
            matrix_height: 64,
            background: "#000000".into(),
            key_bindings: KeyBindings::default(),
        }
    }
}

impl PlayerConfig {
    /// Load `~/.config/ledscene/player.json`, falling back to defaults.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match std::fs::read_to_string(&config_path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(path = %config_path.display(), error = %e, "invalid player config, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("ledscene");
        path.push("player.json");
        path
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
        }
    }

    pub fn contract(&self) -> MatrixContract {
        MatrixContract {
            width: self.matrix_width.max(1),
            height: self.matrix_height.max(1),
        }
    }

    pub fn background(&self) -> Rgba {
        self.background.parse().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid background color, using black");
            Rgba::BLACK
        })
    }
}

/// Check whether a crossterm `KeyEvent` matches a binding string from config.
pub fn matches_binding(binding: &str, event: &KeyEvent) -> bool {
    if let Some(rest) = binding.strip_prefix("Ctrl-") {
        return event.modifiers.contains(KeyModifiers::CONTROL)
            && rest
                .chars()
                .next()
                .is_some_and(|c| event.code == KeyCode::Char(c));
    }

    // Plain bindings never fire while Ctrl or Alt is held.
    if event.modifiers.contains(KeyModifiers::CONTROL)
        || event.modifiers.contains(KeyModifiers::ALT)
    {
        return false;
    }

    match binding {
        "Enter" => event.code == KeyCode::Enter,
        "Esc" => event.code == KeyCode::Esc,
        "Space" => event.code == KeyCode::Char(' '),
        s => {
            if let Some(n) = s.strip_prefix('F').and_then(|rest| rest.parse::<u8>().ok()) {
                return event.code == KeyCode::F(n);
            }
            s.chars().next().is_some_and(|c| event.code == KeyCode::Char(c))
        }
    }
}
