use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use mirror_renderer::{
    HarnessConfig, SurfaceSize, VsyncMode, DEFAULT_BOUNCE_UNIFORM, DEFAULT_DISPLAY_INTERVAL,
    DEFAULT_FRAGMENT_ID, DEFAULT_POSITION_ATTRIBUTE, DEFAULT_VERTEX_ID,
};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::bootstrap::{parse_power, parse_surface_size, power_name, ShaderOrigin};
use crate::cli::Args;
use crate::paths::default_config_file;

const DEFAULT_SIZE: SurfaceSize = SurfaceSize {
    width: 1024,
    height: 768,
};
const DEFAULT_BOUNCES: &str = "3";

/// Optional settings read from `config.toml`. Every key may be omitted.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub size: Option<String>,
    #[serde(deserialize_with = "deserialize_text_opt")]
    pub bounces: Option<String>,
    #[serde(deserialize_with = "deserialize_duration_opt")]
    pub display_interval: Option<Duration>,
    pub vsync: Option<bool>,
    pub power: Option<String>,
    pub echo_fps: Option<bool>,
    pub position_attribute: Option<String>,
    pub bounce_uniform: Option<String>,
    pub shaders: Option<ShaderFileConfig>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShaderFileConfig {
    pub vertex: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
    pub page: Option<PathBuf>,
    pub vertex_id: Option<String>,
    pub fragment_id: Option<String>,
}

impl FileConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration file")
    }

    /// Loads `path`. A missing file is only an error when the path was
    /// given explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && !explicit => {
                tracing::debug!(path = %path.display(), "no configuration file");
                return Ok(None);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config at {}", path.display()))
            }
        };
        let config = Self::from_toml(&text)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;
        Ok(Some(config))
    }
}

/// Settings after layering CLI flags over the config file over defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedConfig {
    pub config_file: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub bounces: String,
    #[serde(serialize_with = "serialize_duration")]
    pub display_interval: Duration,
    pub vsync: bool,
    pub power: &'static str,
    pub echo_fps: bool,
    pub position_attribute: String,
    pub bounce_uniform: String,
    pub shaders: ShaderOrigin,
}

impl ResolvedConfig {
    /// Resolves `args` against the config file they point to (or the
    /// default one).
    pub fn discover(args: &Args) -> Result<Self> {
        let (path, explicit) = match args.config.clone() {
            Some(path) => (Some(path), true),
            None => (default_config_file(), false),
        };
        let file = match path.as_deref() {
            Some(path) => FileConfig::load(path, explicit)?,
            None => None,
        };
        let source = file.as_ref().and(path);
        Self::merge(args, file.unwrap_or_default(), source)
    }

    pub fn merge(args: &Args, file: FileConfig, config_file: Option<PathBuf>) -> Result<Self> {
        let size = match (args.size, file.size.as_deref()) {
            (Some(size), _) => size,
            (None, Some(text)) => parse_surface_size(text).context("invalid `size` in config")?,
            (None, None) => DEFAULT_SIZE,
        };
        let power = match (args.power, file.power.as_deref()) {
            (Some(power), _) => power,
            (None, Some(text)) => parse_power(text).context("invalid `power` in config")?,
            (None, None) => Default::default(),
        };
        let vsync = !args.no_vsync && file.vsync.unwrap_or(true);
        let display_interval = args
            .display_interval
            .or(file.display_interval)
            .unwrap_or(DEFAULT_DISPLAY_INTERVAL);
        if display_interval.is_zero() {
            anyhow::bail!("display interval must be greater than zero");
        }

        Ok(Self {
            config_file,
            width: size.width,
            height: size.height,
            bounces: args
                .bounces
                .clone()
                .or(file.bounces)
                .unwrap_or_else(|| DEFAULT_BOUNCES.to_string()),
            display_interval,
            vsync,
            power: power_name(power),
            echo_fps: args.echo_fps || file.echo_fps.unwrap_or(false),
            position_attribute: args
                .position_attribute
                .clone()
                .or(file.position_attribute)
                .unwrap_or_else(|| DEFAULT_POSITION_ATTRIBUTE.to_string()),
            bounce_uniform: args
                .bounce_uniform
                .clone()
                .or(file.bounce_uniform)
                .unwrap_or_else(|| DEFAULT_BOUNCE_UNIFORM.to_string()),
            shaders: resolve_origin(args, file.shaders.unwrap_or_default())?,
        })
    }

    /// Loads the shader stages and builds the harness configuration.
    pub fn into_harness_config(self) -> Result<HarnessConfig> {
        let sources = self.shaders.load()?;
        let mut config = HarnessConfig::new(sources);
        config.surface_size = SurfaceSize::new(self.width, self.height);
        config.initial_bounces = self.bounces;
        config.display_interval = self.display_interval;
        config.echo_status = self.echo_fps;
        config.position_attribute = self.position_attribute;
        config.bounce_uniform = self.bounce_uniform;
        config.gpu_power = parse_power(self.power)?;
        config.vsync = if self.vsync {
            VsyncMode::On
        } else {
            VsyncMode::Off
        };
        Ok(config)
    }
}

/// CLI sources win as a whole over file sources; stage files win over a page.
fn resolve_origin(args: &Args, file: ShaderFileConfig) -> Result<ShaderOrigin> {
    if let (Some(vertex), Some(fragment)) = (&args.vertex, &args.fragment) {
        return Ok(ShaderOrigin::Files {
            vertex: vertex.clone(),
            fragment: fragment.clone(),
        });
    }
    if let Some(page) = &args.page {
        return Ok(ShaderOrigin::Page {
            page: page.clone(),
            vertex_id: args
                .vertex_id
                .clone()
                .or(file.vertex_id)
                .unwrap_or_else(|| DEFAULT_VERTEX_ID.to_string()),
            fragment_id: args
                .fragment_id
                .clone()
                .or(file.fragment_id)
                .unwrap_or_else(|| DEFAULT_FRAGMENT_ID.to_string()),
        });
    }
    match (file.vertex, file.fragment, file.page) {
        (Some(vertex), Some(fragment), _) => Ok(ShaderOrigin::Files { vertex, fragment }),
        (Some(_), None, _) | (None, Some(_), _) => {
            anyhow::bail!("config `shaders` needs both `vertex` and `fragment`")
        }
        (None, None, Some(page)) => Ok(ShaderOrigin::Page {
            page,
            vertex_id: file
                .vertex_id
                .unwrap_or_else(|| DEFAULT_VERTEX_ID.to_string()),
            fragment_id: file
                .fragment_id
                .unwrap_or_else(|| DEFAULT_FRAGMENT_ID.to_string()),
        }),
        (None, None, None) => Ok(ShaderOrigin::Bundled),
    }
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

/// Accepts `bounces = "3"` as well as bare numbers such as `bounces = 3`.
fn deserialize_text_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a string or a number")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }
    }

    deserializer.deserialize_any(Visitor)
}

/// Durations as human-readable strings (`"300ms"`) or whole milliseconds.
fn deserialize_duration_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<Duration>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of milliseconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map(Some)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(Duration::from_millis(v)))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if v < 0 {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Some(Duration::from_millis(v as u64)))
        }
    }

    deserializer.deserialize_any(Visitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let resolved = ResolvedConfig::merge(&Args::default(), FileConfig::default(), None).unwrap();
        assert_eq!((resolved.width, resolved.height), (1024, 768));
        assert_eq!(resolved.bounces, "3");
        assert_eq!(resolved.display_interval, Duration::from_millis(300));
        assert!(resolved.vsync);
        assert_eq!(resolved.power, "high");
        assert_eq!(resolved.position_attribute, "vPosition");
        assert_eq!(resolved.bounce_uniform, "num_bounces");
        assert_eq!(resolved.shaders, ShaderOrigin::Bundled);
    }

    #[test]
    fn file_values_fill_gaps_and_flags_win() {
        let file = FileConfig::from_toml(
            r#"
size = "640x480"
bounces = 7
display_interval = "1s"
vsync = false
power = "low"

[shaders]
page = "scene.html"
fragment_id = "fs"
"#,
        )
        .unwrap();
        let args = Args {
            bounces: Some("2".into()),
            size: Some(SurfaceSize::new(800, 600)),
            ..Args::default()
        };
        let resolved = ResolvedConfig::merge(&args, file, None).unwrap();
        assert_eq!((resolved.width, resolved.height), (800, 600));
        assert_eq!(resolved.bounces, "2");
        assert_eq!(resolved.display_interval, Duration::from_secs(1));
        assert!(!resolved.vsync);
        assert_eq!(resolved.power, "low");
        assert_eq!(
            resolved.shaders,
            ShaderOrigin::Page {
                page: PathBuf::from("scene.html"),
                vertex_id: "vertex-shader".into(),
                fragment_id: "fs".into(),
            }
        );
    }

    #[test]
    fn numeric_durations_are_milliseconds() {
        let file = FileConfig::from_toml("display_interval = 250").unwrap();
        assert_eq!(file.display_interval, Some(Duration::from_millis(250)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::from_toml("fps_smoothing = true").is_err());
    }

    #[test]
    fn half_specified_stage_files_are_rejected() {
        let file = FileConfig::from_toml("[shaders]\nvertex = \"a.vert\"").unwrap();
        assert!(ResolvedConfig::merge(&Args::default(), file, None).is_err());
    }

    #[test]
    fn zero_display_interval_is_rejected() {
        let args = Args {
            display_interval: Some(Duration::ZERO),
            ..Args::default()
        };
        assert!(ResolvedConfig::merge(&args, FileConfig::default(), None).is_err());
    }

    #[test]
    fn missing_default_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(FileConfig::load(&path, false).unwrap().is_none());
        assert!(FileConfig::load(&path, true).is_err());
    }

    #[test]
    fn resolved_config_feeds_harness() {
        let args = Args {
            no_vsync: true,
            echo_fps: true,
            ..Args::default()
        };
        let config = ResolvedConfig::merge(&args, FileConfig::default(), None)
            .unwrap()
            .into_harness_config()
            .unwrap();
        assert_eq!(config.vsync, VsyncMode::Off);
        assert!(config.echo_status);
        assert_eq!(config.initial_bounces, "3");
        assert!(config.sources.fragment.contains("num_bounces"));
    }
}
