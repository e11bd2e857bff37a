//! `promote config show`: resolved settings and their sources.

use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use super::{Output, json_string};
use crate::config::{Resolved, Settings};

/// One resolved setting as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingView {
    pub key: &'static str,
    /// Display value; tokens are masked
    pub value: Option<String>,
    /// Where the value came from (`cli`, `env:NAME`, `session`, `system`, `default`)
    pub source: Option<String>,
}

impl SettingView {
    fn from_resolved<T>(
        key: &'static str,
        resolved: Option<&Resolved<T>>,
        display: impl Fn(&T) -> String,
    ) -> Self {
        Self {
            key,
            value: resolved.map(|r| display(&r.value)),
            source: resolved.map(|r| r.source.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigShow {
    pub settings: Vec<SettingView>,
    pub loaded_files: Vec<PathBuf>,
}

impl Output for ConfigShow {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = String::new();
        for setting in &self.settings {
            match (&setting.value, &setting.source) {
                (Some(value), Some(source)) => {
                    let _ = writeln!(out, "{:<22} {} ({})", setting.key, value, source);
                }
                _ => {
                    let _ = writeln!(out, "{:<22} (not set)", setting.key);
                }
            }
        }
        if self.loaded_files.is_empty() {
            out.push_str("\nNo config file found.");
        } else {
            out.push_str("\nConfig files:");
            for path in &self.loaded_files {
                let _ = write!(out, "\n  {}", path.display());
            }
        }
        out
    }
}

/// Describe resolved settings, masking tokens.
pub fn config_show(settings: &Settings) -> ConfigShow {
    let masked = |token: &String| crate::config::mask_token(token);
    let plain = |value: &String| value.clone();

    ConfigShow {
        settings: vec![
            SettingView::from_resolved("source.url", settings.source.url.as_ref(), plain),
            SettingView::from_resolved("source.token", settings.source.token.as_ref(), masked),
            SettingView::from_resolved("target.url", settings.target.url.as_ref(), plain),
            SettingView::from_resolved("target.token", settings.target.token.as_ref(), masked),
            SettingView::from_resolved("snapshot_dir", Some(&settings.snapshot_dir), |p| {
                p.display().to_string()
            }),
            SettingView::from_resolved("gate_delay_secs", Some(&settings.gate_delay), |d| {
                d.as_secs().to_string()
            }),
            SettingView::from_resolved(
                "system_field_markers",
                Some(&settings.system_field_markers),
                |markers| markers.join(", "),
            ),
        ],
        loaded_files: settings.loaded_files.clone(),
    }
}
