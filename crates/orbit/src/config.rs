use crate::reveal::RevealSettings;
use crate::ring::ImageRef;
use directories::ProjectDirs;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use serde_with::DeserializeFromStr;
use std::time::Duration;
use strum::{Display as StrumDisplay, EnumString};
use thiserror::Error;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    DeserializeFromStr,
    EnumString,
    StrumDisplay,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    /// Fill the panel, cropping and shifting with the ring (parallax).
    #[default]
    #[strum(serialize = "cover")]
    Cover,
    /// Fit the whole image, centered.
    #[strum(serialize = "contain")]
    Contain,
}

/// Tunables for one ring. Lengths are in CSS pixels, angles in degrees, delays in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RingSettings {
    pub width: f64,
    pub height: f64,
    pub perspective: f64,
    pub panel_distance: f64,
    pub initial_rotation: f64,
    pub animation_duration: f64,
    pub stagger_delay: f64,
    pub draggable: bool,
    pub mobile_breakpoint: f64,
    pub mobile_scale_factor: f64,
    /// Degrees of rotation per pixel of horizontal drag.
    pub drag_sensitivity: f64,
    /// Scales the release velocity into the projected glide distance.
    pub velocity_multiplier: f64,
    pub time_constant_ms: f64,
    /// Remaining distance below which a glide snaps onto its target.
    pub rest_delta: f64,
    /// Releases at or above this speed glide; slower releases snap at once.
    pub release_velocity_threshold: f64,
    /// Number of recent drag deltas averaged into the release velocity.
    pub velocity_window: usize,
    /// Fraction of a panel slot moved per arrow key press.
    pub nudge_fraction: f64,
    pub image_fit: ImageFit,
    pub max_texture_size: u32,
}

impl Default for RingSettings {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 300.0,
            perspective: 2000.0,
            panel_distance: 500.0,
            initial_rotation: 180.0,
            animation_duration: 1.5,
            stagger_delay: 0.1,
            draggable: true,
            mobile_breakpoint: 768.0,
            mobile_scale_factor: 0.8,
            drag_sensitivity: 0.5,
            velocity_multiplier: 0.0,
            time_constant_ms: 200.0,
            rest_delta: 0.5,
            release_velocity_threshold: 0.0,
            velocity_window: 1,
            nudge_fraction: 0.1,
            image_fit: ImageFit::Cover,
            max_texture_size: 1024,
        }
    }
}

/// Longest glide time constant accepted from configuration (one minute).
pub const MAX_TIME_CONSTANT_MS: f64 = 60_000.0;

fn repair(name: &str, value: &mut f64, fallback: f64, valid: impl Fn(f64) -> bool) {
    if !value.is_finite() || !valid(*value) {
        log::warn!("Invalid ring setting {name} = {value}, using {fallback}");
        *value = fallback;
    }
}

impl RingSettings {
    /// Replaces non-finite or out-of-range values with their defaults.
    pub fn sanitized(mut self) -> Self {
        let d = Self::default();
        let any = |_: f64| true;
        let positive = |v: f64| v > 0.0;
        let non_negative = |v: f64| v >= 0.0;

        repair("width", &mut self.width, d.width, positive);
        repair("height", &mut self.height, d.height, positive);
        repair("perspective", &mut self.perspective, d.perspective, positive);
        repair("panel_distance", &mut self.panel_distance, d.panel_distance, non_negative);
        repair("initial_rotation", &mut self.initial_rotation, d.initial_rotation, any);
        repair(
            "animation_duration",
            &mut self.animation_duration,
            d.animation_duration,
            non_negative,
        );
        repair("stagger_delay", &mut self.stagger_delay, d.stagger_delay, non_negative);
        repair(
            "mobile_breakpoint",
            &mut self.mobile_breakpoint,
            d.mobile_breakpoint,
            non_negative,
        );
        repair(
            "mobile_scale_factor",
            &mut self.mobile_scale_factor,
            d.mobile_scale_factor,
            positive,
        );
        repair("drag_sensitivity", &mut self.drag_sensitivity, d.drag_sensitivity, any);
        repair(
            "velocity_multiplier",
            &mut self.velocity_multiplier,
            d.velocity_multiplier,
            any,
        );
        repair(
            "time_constant_ms",
            &mut self.time_constant_ms,
            d.time_constant_ms,
            |v| (0.0..=MAX_TIME_CONSTANT_MS).contains(&v),
        );
        repair("rest_delta", &mut self.rest_delta, d.rest_delta, positive);
        repair(
            "release_velocity_threshold",
            &mut self.release_velocity_threshold,
            d.release_velocity_threshold,
            non_negative,
        );
        repair("nudge_fraction", &mut self.nudge_fraction, d.nudge_fraction, any);

        if self.velocity_window == 0 {
            log::warn!("Invalid ring setting velocity_window = 0, using 1");
            self.velocity_window = 1;
        }
        self
    }

    pub fn time_constant(&self) -> Duration {
        let ms = self.time_constant_ms.clamp(0.0, MAX_TIME_CONSTANT_MS);
        Duration::try_from_secs_f64(ms / 1000.0)
            .unwrap_or(Duration::from_millis(Self::default().time_constant_ms as u64))
    }

    pub fn texture_size(&self) -> u32 {
        self.max_texture_size
            .clamp(crate::ring::MIN_TEXTURE_SIZE, crate::ring::MAX_TEXTURE_SIZE)
    }
}

/// Per-section replacements for the shared `[ring]` defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RingOverrides {
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub perspective: Option<f64>,
    pub panel_distance: Option<f64>,
    pub initial_rotation: Option<f64>,
    pub animation_duration: Option<f64>,
    pub stagger_delay: Option<f64>,
    pub draggable: Option<bool>,
    pub mobile_breakpoint: Option<f64>,
    pub mobile_scale_factor: Option<f64>,
    pub drag_sensitivity: Option<f64>,
    pub velocity_multiplier: Option<f64>,
    pub time_constant_ms: Option<f64>,
    pub rest_delta: Option<f64>,
    pub release_velocity_threshold: Option<f64>,
    pub velocity_window: Option<usize>,
    pub nudge_fraction: Option<f64>,
    pub image_fit: Option<ImageFit>,
    pub max_texture_size: Option<u32>,
}

macro_rules! overlay {
    ($base:expr, $over:expr, $($field:ident),+ $(,)?) => {{
        let mut merged = $base.clone();
        $(
            if let Some(v) = $over.$field {
                merged.$field = v;
            }
        )+
        merged
    }};
}

impl RingOverrides {
    pub fn apply(&self, base: &RingSettings) -> RingSettings {
        overlay!(
            base,
            self,
            width,
            height,
            perspective,
            panel_distance,
            initial_rotation,
            animation_duration,
            stagger_delay,
            draggable,
            mobile_breakpoint,
            mobile_scale_factor,
            drag_sensitivity,
            velocity_multiplier,
            time_constant_ms,
            rest_delta,
            release_velocity_threshold,
            velocity_window,
            nudge_fraction,
            image_fit,
            max_texture_size,
        )
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SectionConfig {
    pub title: String,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub overrides: RingOverrides,
}

impl SectionConfig {
    pub fn settings(&self, base: &RingSettings) -> RingSettings {
        self.overrides.apply(base)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub ring: RingSettings,
    #[serde(default)]
    pub reveal: RevealSettings,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine config directory")]
    ConfigDirNotFound,
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}

pub fn get_config_path() -> Result<std::path::PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("dev", "portfolio", "orbit").ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(proj_dirs.config_dir().join("config.toml"))
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("ORBIT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Reads the user config, or the bundled template when there is no user file.
/// Environment overrides apply on top of either.
pub fn load_config() -> Result<Config, ConfigError> {
    load_from(&get_config_path()?)
}

pub fn load_from(path: &std::path::Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        log::info!("No config at {}, using bundled defaults", path.display());
        return bundled_with(Some(environment()));
    }

    let s = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment())
        .build()?;

    Ok(s.try_deserialize()?)
}

/// Parses the bundled template with the `ORBIT` environment overrides.
pub fn bundled_config() -> Result<Config, ConfigError> {
    bundled_with(Some(environment()))
}

fn bundled_with(env: Option<config::Environment>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder().add_source(config::File::from_str(
        DEFAULT_CONFIG,
        config::FileFormat::Toml,
    ));
    if let Some(env) = env {
        builder = builder.add_source(env);
    }

    Ok(builder.build()?.try_deserialize()?)
}

pub fn load_or_setup() -> Config {
    load_config().unwrap_or_else(|e| {
        log::warn!("Failed to load config, using bundled defaults: {}", e);
        // without environment overrides
        bundled_with(None).unwrap_or_else(|e| {
            log::error!("Bundled config is invalid: {}", e);
            Config::default()
        })
    })
}

pub fn write_default_config() -> std::io::Result<std::path::PathBuf> {
    let path =
        get_config_path().map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e))?;
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    if !path.exists() {
        fs_err::write(&path, DEFAULT_CONFIG)?;
    }
    Ok(path)
}

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

use crate::events::AppEvent;
use async_channel::Sender;

fn touches(event: &notify::Event, path: &std::path::Path) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    );
    relevant && event.paths.iter().any(|p| p == path)
}

/// Watches the config directory and sends `ConfigReload` whenever the config file
/// is written, created or removed. Returns when the receiver is gone.
pub async fn run_async_watcher(tx: Sender<AppEvent>) {
    let config_path = match get_config_path() {
        Ok(p) => p,
        Err(e) => {
            log::error!("Config watcher disabled: {}", e);
            return;
        }
    };
    let Some(config_dir) = config_path.parent().map(|p| p.to_path_buf()) else {
        return;
    };
    if let Err(e) = fs_err::create_dir_all(&config_dir) {
        log::error!("Config watcher disabled: {}", e);
        return;
    }

    let (fs_tx, fs_rx) = async_channel::unbounded::<notify::Result<notify::Event>>();
    let watcher = RecommendedWatcher::new(
        move |res| {
            let _ = fs_tx.send_blocking(res);
        },
        notify::Config::default(),
    )
    .and_then(|mut w| {
        w.watch(&config_dir, RecursiveMode::NonRecursive)?;
        Ok(w)
    });
    // The watcher stops delivering events once dropped.
    let _watcher = match watcher {
        Ok(w) => w,
        Err(e) => {
            log::error!("Failed to watch {}: {}", config_dir.display(), e);
            return;
        }
    };
    log::debug!("Watching {}", config_path.display());

    while let Ok(res) = fs_rx.recv().await {
        match res {
            Ok(event) if touches(&event, &config_path) => {
                if tx.send(AppEvent::ConfigReload).await.is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("Config watch error: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_fit_deserialization() {
        let cases = vec![
            ("\"cover\"", ImageFit::Cover),
            ("\"Cover\"", ImageFit::Cover),
            ("\"CONTAIN\"", ImageFit::Contain),
            ("\"contain\"", ImageFit::Contain),
        ];

        for (json, expected) in cases {
            let deserialized: ImageFit = serde_json::from_str(json).unwrap();
            assert_eq!(deserialized, expected);
        }
    }

    #[test]
    fn test_sanitized_replaces_non_finite_values() {
        let settings = RingSettings {
            width: f64::NAN,
            panel_distance: f64::INFINITY,
            drag_sensitivity: f64::NEG_INFINITY,
            rest_delta: 0.0,
            mobile_scale_factor: -1.0,
            velocity_window: 0,
            ..RingSettings::default()
        }
        .sanitized();

        let defaults = RingSettings::default();
        assert_eq!(settings.width, defaults.width);
        assert_eq!(settings.panel_distance, defaults.panel_distance);
        assert_eq!(settings.drag_sensitivity, defaults.drag_sensitivity);
        assert_eq!(settings.rest_delta, defaults.rest_delta);
        assert_eq!(settings.mobile_scale_factor, defaults.mobile_scale_factor);
        assert_eq!(settings.velocity_window, 1);
    }

    #[test]
    fn test_sanitized_keeps_valid_values() {
        let settings = RingSettings {
            initial_rotation: -720.0,
            velocity_multiplier: -3.0,
            time_constant_ms: 0.0,
            ..RingSettings::default()
        };
        assert_eq!(settings.clone().sanitized(), settings);
    }

    #[test]
    fn test_texture_size_is_capped() {
        let mut settings = RingSettings::default();
        assert_eq!(settings.texture_size(), 1024);
        settings.max_texture_size = 64;
        assert_eq!(settings.texture_size(), 512);
        settings.max_texture_size = 8192;
        assert_eq!(settings.texture_size(), 2048);
    }

    #[test]
    fn test_overrides_apply_on_top_of_defaults() {
        let base = RingSettings {
            panel_distance: 1000.0,
            initial_rotation: 0.0,
            image_fit: ImageFit::Contain,
            ..RingSettings::default()
        };
        let overrides = RingOverrides {
            width: Some(450.0),
            height: Some(550.0),
            ..RingOverrides::default()
        };

        let merged = overrides.apply(&base);
        assert_eq!(merged.width, 450.0);
        assert_eq!(merged.height, 550.0);
        assert_eq!(merged.panel_distance, 1000.0);
        assert_eq!(merged.image_fit, ImageFit::Contain);
    }

    #[test]
    fn test_section_deserialization() {
        let json = r#"{
            "title": "Events",
            "images": ["optimized/triad/event/1-1600.webp"],
            "overrides": { "width": 450, "image_fit": "contain" }
        }"#;
        let section: SectionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(section.title, "Events");
        assert_eq!(section.images.len(), 1);
        assert_eq!(section.overrides.width, Some(450.0));
        assert_eq!(section.overrides.image_fit, Some(ImageFit::Contain));
        assert_eq!(section.overrides.height, None);
    }

    #[test]
    fn test_oversized_time_constant_is_replaced() {
        let settings = RingSettings {
            time_constant_ms: 1e30,
            ..RingSettings::default()
        }
        .sanitized();
        assert_eq!(settings.time_constant_ms, 200.0);
        assert_eq!(settings.time_constant(), Duration::from_millis(200));

        let unsanitized = RingSettings {
            time_constant_ms: 1e30,
            ..RingSettings::default()
        };
        assert_eq!(unsanitized.time_constant(), Duration::from_secs(60));
    }

    #[test]
    fn test_missing_file_loads_bundled_sections() {
        let missing = std::env::temp_dir().join("orbit-missing-dir/config.toml");
        let config = load_from(&missing).unwrap();
        let bundled = bundled_config().unwrap();
        assert_eq!(config.sections.len(), bundled.sections.len());
        assert!(!config.sections.is_empty());
    }

    #[test]
    fn test_environment_overrides_bundled_template() {
        let vars: config::Map<String, String> = [
            ("ORBIT_RING__WIDTH", "380"),
            ("ORBIT_REVEAL__ONCE", "true"),
            ("UNRELATED_WIDTH", "1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = bundled_with(Some(environment().source(Some(vars)))).unwrap();
        assert_eq!(config.ring.width, 380.0);
        assert!(config.reveal.once);
        assert_eq!(config.ring.image_fit, ImageFit::Contain);
    }

    #[test]
    fn test_bundled_config_parses() {
        let config = bundled_config().unwrap();
        assert!(!config.sections.is_empty());
        assert!(config.sections.iter().all(|s| !s.images.is_empty()));
        assert_eq!(config.ring.image_fit, ImageFit::Contain);
    }
}
