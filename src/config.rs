//! Startup options and persisted UI settings.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chezmoi::DotfileService;
use crate::theme;

/// What Esc does at the top level of a tab screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscBehavior {
    /// Esc returns to the landing screen; only `q` from landing exits.
    EscQuit,
    /// Esc exits immediately, handing control back to the caller.
    EscBack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconMode {
    Auto,
    Nerd,
    Ascii,
    None,
}

impl IconMode {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "auto" => Ok(IconMode::Auto),
            "nerd" => Ok(IconMode::Nerd),
            "ascii" => Ok(IconMode::Ascii),
            "none" => Ok(IconMode::None),
            other => Err(format!("unknown icon mode {:?}", other)),
        }
    }
}

/// Initial visibility of the preview panel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanelModeOption {
    Auto,
    Show,
    Hide,
}

impl PanelModeOption {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "auto" => Ok(PanelModeOption::Auto),
            "show" => Ok(PanelModeOption::Show),
            "hide" => Ok(PanelModeOption::Hide),
            other => Err(format!("unknown panel mode {:?}", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitialTab {
    Status,
    Files,
    Info,
    Commands,
}

impl InitialTab {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "status" => Ok(InitialTab::Status),
            "files" => Ok(InitialTab::Files),
            "info" => Ok(InitialTab::Info),
            "commands" => Ok(InitialTab::Commands),
            other => Err(format!("unknown initial tab {:?}", other)),
        }
    }
}

/// Options consumed by [`crate::App::new`].
///
/// `service` is required; building options without one panics, since it
/// indicates a defective integration rather than a user-facing condition.
pub struct Options {
    pub service: Arc<dyn DotfileService + Send + Sync>,
    pub esc_behavior: EscBehavior,
    pub initial_tab: InitialTab,
    pub panel_mode: PanelModeOption,
    pub icon_mode: IconMode,
    pub commit_presets: Vec<String>,
    pub breadcrumb: Option<String>,
    pub debug_log: Option<PathBuf>,
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("esc_behavior", &self.esc_behavior)
            .field("initial_tab", &self.initial_tab)
            .field("panel_mode", &self.panel_mode)
            .field("icon_mode", &self.icon_mode)
            .field("commit_presets", &self.commit_presets)
            .field("breadcrumb", &self.breadcrumb)
            .field("debug_log", &self.debug_log)
            .finish_non_exhaustive()
    }
}

impl Options {
    pub fn new(service: Option<Arc<dyn DotfileService + Send + Sync>>) -> Self {
        let Some(service) = service else {
            panic!("Options::new: a dotfile service is required");
        };
        Self {
            service,
            esc_behavior: EscBehavior::EscQuit,
            initial_tab: InitialTab::Status,
            panel_mode: PanelModeOption::Auto,
            icon_mode: IconMode::Auto,
            commit_presets: Vec::new(),
            breadcrumb: None,
            debug_log: None,
        }
    }

    /// Apply string-valued settings (CLI flags, env), validating each.
    pub fn apply(
        mut self,
        initial_tab: Option<&str>,
        panel_mode: Option<&str>,
        icon_mode: Option<&str>,
    ) -> Result<Self, String> {
        if let Some(s) = initial_tab {
            self.initial_tab = InitialTab::parse(s)?;
        }
        if let Some(s) = panel_mode {
            self.panel_mode = PanelModeOption::parse(s)?;
        }
        if let Some(s) = icon_mode {
            self.icon_mode = IconMode::parse(s)?;
        }
        Ok(self)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct PersistedUiSettings {
    #[serde(default)]
    theme: Option<theme::Theme>,
    #[serde(default)]
    icon_mode: Option<IconMode>,
    #[serde(default)]
    panel_override: Option<bool>,
}

pub fn ui_settings_file_path() -> Option<PathBuf> {
    let home = env::home_dir()?;
    let base = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".config"));
    Some(base.join("dotui").join("ui.json"))
}

pub struct UiSettings {
    pub theme: Option<theme::Theme>,
    pub icon_mode: Option<IconMode>,
    pub panel_override: Option<bool>,
}

/// Best-effort load; silent on missing or malformed file.
pub fn load_ui_settings(path: Option<&PathBuf>) -> UiSettings {
    let empty = UiSettings {
        theme: None,
        icon_mode: None,
        panel_override: None,
    };
    let Some(path) = path else {
        return empty;
    };
    let Some(data) = fs::read_to_string(path).ok() else {
        return empty;
    };
    let settings: PersistedUiSettings = match serde_json::from_str(&data) {
        Ok(s) => s,
        Err(_) => return empty,
    };
    UiSettings {
        theme: settings.theme,
        icon_mode: settings.icon_mode,
        panel_override: settings.panel_override,
    }
}

pub fn save_ui_settings(
    path: Option<&PathBuf>,
    theme: theme::Theme,
    icon_mode: IconMode,
    panel_override: Option<bool>,
) {
    let Some(path) = path else {
        return;
    };

    let settings = PersistedUiSettings {
        theme: Some(theme),
        icon_mode: Some(icon_mode),
        panel_override,
    };
    let content = match serde_json::to_string(&settings) {
        Ok(s) => s,
        Err(_) => return,
    };

    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }

    let tmp = path.with_extension("tmp");
    if fs::write(&tmp, content).is_err() || fs::rename(&tmp, path).is_err() {
        let _ = fs::remove_file(&tmp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chezmoi::tests::FakeService;

    fn service() -> Arc<dyn DotfileService + Send + Sync> {
        Arc::new(FakeService::default())
    }

    #[test]
    fn rejects_unknown_icon_mode() {
        let err = Options::new(Some(service()))
            .apply(None, None, Some("emoji"))
            .unwrap_err();
        assert!(err.contains("icon mode"));
    }

    #[test]
    fn rejects_unknown_panel_mode() {
        let err = Options::new(Some(service()))
            .apply(None, Some("sometimes"), None)
            .unwrap_err();
        assert!(err.contains("panel mode"));
    }

    #[test]
    fn parses_valid_settings() {
        let opts = Options::new(Some(service()))
            .apply(Some("info"), Some("hide"), Some("ascii"))
            .unwrap();
        assert_eq!(opts.initial_tab, InitialTab::Info);
        assert_eq!(opts.panel_mode, PanelModeOption::Hide);
        assert_eq!(opts.icon_mode, IconMode::Ascii);
    }

    #[test]
    #[should_panic(expected = "service is required")]
    fn missing_service_panics() {
        let _ = Options::new(None);
    }

    #[test]
    fn ui_settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui.json");
        save_ui_settings(
            Some(&path),
            theme::Theme::Nord,
            IconMode::Ascii,
            Some(true),
        );
        let loaded = load_ui_settings(Some(&path));
        assert_eq!(loaded.theme, Some(theme::Theme::Nord));
        assert_eq!(loaded.icon_mode, Some(IconMode::Ascii));
        assert_eq!(loaded.panel_override, Some(true));
    }

    #[test]
    fn malformed_settings_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ui.json");
        fs::write(&path, "{not json").unwrap();
        let loaded = load_ui_settings(Some(&path));
        assert!(loaded.theme.is_none());
    }
}
