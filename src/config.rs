use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{HighlightError, HighlightResult};

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "LAYOUT_HIGHLIGHTER_CONFIG";

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

/// Stroke style for highlight rectangles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_dash")]
    pub dash_on: u32,
    #[serde(default = "default_dash")]
    pub dash_off: u32,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: u32,
    /// `#rrggbb` or `#rrggbbaa`.
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            dash_on: default_dash(),
            dash_off: default_dash(),
            stroke_width: default_stroke_width(),
            color: default_color(),
        }
    }
}

fn default_dash() -> u32 {
    25
}

fn default_stroke_width() -> u32 {
    15
}

fn default_color() -> String {
    "#ffff00".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Delay before a `Done` status is cleared.
    #[serde(default = "default_status_clear_after_ms")]
    pub status_clear_after_ms: u64,
    /// Abort a run when two layout dumps share a base name.
    #[serde(default)]
    pub strict_names: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            status_clear_after_ms: default_status_clear_after_ms(),
            strict_names: false,
        }
    }
}

fn default_status_clear_after_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("highlights")
}

/// Parse `#rrggbb` / `#rrggbbaa` into RGBA. Alpha defaults to opaque.
pub fn parse_hex_color(s: &str) -> HighlightResult<[u8; 4]> {
    let hex = s.trim().trim_start_matches('#');
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        return Err(HighlightError::Config(format!("invalid colour '{s}'")));
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| HighlightError::Config(format!("invalid colour '{s}'")))
    };
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok([channel(0)?, channel(2)?, channel(4)?, alpha])
}

fn resolve_config_path(explicit: Option<&Path>) -> HighlightResult<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(HighlightError::Config(format!(
            "config file {} does not exist",
            path.display()
        )));
    }

    if let Ok(from_env) = std::env::var(CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(from_env);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found via {CONFIG_ENV_VAR}");
            return Ok(candidate);
        }
        tracing::warn!(path = %candidate.display(), "{CONFIG_ENV_VAR} points at a missing file");
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join(CONFIG_FILE_NAME);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("layout-highlighter").join(CONFIG_FILE_NAME);
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config dir");
            return Ok(candidate);
        }
    }

    Err(HighlightError::Config(
        "config.toml not found next to executable, in working directory or user config dir".into(),
    ))
}

pub fn parse_config(content: &str) -> HighlightResult<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    // Fail early on a bad colour instead of at the first render.
    parse_hex_color(&config.overlay.color)?;
    Ok(config)
}

pub fn load_config(explicit: Option<&Path>) -> HighlightResult<AppConfig> {
    let path = resolve_config_path(explicit)?;
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), "config loaded");
    Ok(config)
}

pub fn save_config(config: &AppConfig, path: &Path) -> HighlightResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.overlay.dash_on, 25);
        assert_eq!(cfg.overlay.dash_off, 25);
        assert_eq!(cfg.overlay.stroke_width, 15);
        assert_eq!(cfg.overlay.color, "#ffff00");
        assert_eq!(cfg.batch.status_clear_after_ms, 2000);
        assert!(!cfg.batch.strict_names);
        assert_eq!(cfg.export.output_dir, PathBuf::from("highlights"));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = parse_config(
            "[overlay]\nstroke_width = 4\n\n[batch]\nstrict_names = true\n",
        )
        .unwrap();
        assert_eq!(cfg.overlay.stroke_width, 4);
        assert_eq!(cfg.overlay.dash_on, 25);
        assert!(cfg.batch.strict_names);
        assert_eq!(cfg.batch.status_clear_after_ms, 2000);
    }

    #[test]
    fn bad_colour_is_rejected() {
        let err = parse_config("[overlay]\ncolor = \"yellow\"\n").unwrap_err();
        assert!(matches!(err, HighlightError::Config(_)));
    }

    #[test]
    fn hex_colours() {
        assert_eq!(parse_hex_color("#ffff00").unwrap(), [255, 255, 0, 255]);
        assert_eq!(parse_hex_color("00ff0080").unwrap(), [0, 255, 0, 128]);
        assert!(parse_hex_color("#fff").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
    }

    #[test]
    fn save_then_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.batch.status_clear_after_ms = 500;
        save_config(&cfg, &path).unwrap();

        let loaded = load_config(Some(&path)).unwrap();
        assert_eq!(loaded.batch.status_clear_after_ms, 500);
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());
    }
}
