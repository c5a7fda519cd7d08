//! Function configuration.
//!
//! Loaded from, in increasing priority:
//! 1. Compiled-in defaults
//! 2. `/var/task/thumbnail.toml` (optional)
//! 3. `IMAGE_BUCKET`, which names the single bucket holding both prefixes
//! 4. `THUMBNAIL_*` variables, nested with `__`
//!    (e.g. `THUMBNAIL_THUMBNAIL__SIZE=medium`)

use crate::resizer::Dimensions;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Path of the optional configuration file inside a Lambda package.
pub const DEFAULT_CONFIG_PATH: &str = "/var/task/thumbnail.toml";

const ENV_PREFIX: &str = "THUMBNAIL_";
const BUCKET_ENV: &str = "IMAGE_BUCKET";

/// Target thumbnail size.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThumbnailSize {
    /// 320 x 200.
    ExtraSmall,
    /// 160 x 90.
    #[default]
    Small,
    /// 800 x 600.
    Medium,
}

impl ThumbnailSize {
    /// Pixel dimensions of this size.
    pub const fn dimensions(self) -> Dimensions {
        match self {
            Self::ExtraSmall => Dimensions::new(320, 200),
            Self::Small => Dimensions::new(160, 90),
            Self::Medium => Dimensions::new(800, 600),
        }
    }
}

/// Complete function configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where originals and thumbnails live.
    pub storage: StorageConfig,
    /// Output settings.
    pub thumbnail: ThumbnailConfig,
    /// Trace propagation settings.
    pub trace: TraceConfig,
}

impl Config {
    /// Loads configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to parse.
    #[allow(clippy::result_large_err)]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration with a custom file path.
    ///
    /// # Errors
    ///
    /// Returns an error if a source fails to parse.
    #[allow(clippy::result_large_err)]
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if config_path.as_ref().exists() {
            figment = figment.merge(Toml::file(config_path));
        }

        if let Ok(bucket) = std::env::var(BUCKET_ENV) {
            figment = figment
                .merge(Serialized::default("storage.input_container", &bucket))
                .merge(Serialized::default("storage.output_container", &bucket));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract()
    }
}

/// Storage containers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Container receiving `input/<name>` originals.
    pub input_container: String,
    /// Container receiving `output/<name>` thumbnails.
    pub output_container: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            input_container: "input".to_string(),
            output_container: "output".to_string(),
        }
    }
}

/// Thumbnail output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Target size.
    pub size: ThumbnailSize,
    /// Content type used when the source object has none.
    pub content_type: String,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: ThumbnailSize::Small,
            content_type: "image/jpeg".to_string(),
        }
    }
}

/// Trace propagation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Start a new trace at the upload when the request carries none.
    pub synthesize_missing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VARS: [&str; 4] = [
        BUCKET_ENV,
        "THUMBNAIL_THUMBNAIL__SIZE",
        "THUMBNAIL_TRACE__SYNTHESIZE_MISSING",
        "THUMBNAIL_STORAGE__OUTPUT_CONTAINER",
    ];

    fn without_env<R>(f: impl FnOnce() -> R) -> R {
        temp_env::with_vars_unset(VARS, f)
    }

    #[test]
    fn test_size_table() {
        assert_eq!(ThumbnailSize::ExtraSmall.dimensions(), Dimensions::new(320, 200));
        assert_eq!(ThumbnailSize::Small.dimensions(), Dimensions::new(160, 90));
        assert_eq!(ThumbnailSize::Medium.dimensions(), Dimensions::new(800, 600));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.input_container, "input");
        assert_eq!(config.storage.output_container, "output");
        assert_eq!(config.thumbnail.size, ThumbnailSize::Small);
        assert_eq!(config.thumbnail.content_type, "image/jpeg");
        assert!(!config.trace.synthesize_missing);
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        let config = without_env(|| Config::load_from_path("/nonexistent/thumbnail.toml")).unwrap();
        assert_eq!(config.storage.input_container, "input");
        assert_eq!(config.thumbnail.size, ThumbnailSize::Small);
    }

    #[test]
    #[serial]
    fn test_load_from_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[storage]
input_container = "originals"

[thumbnail]
size = "extra_small"

[trace]
synthesize_missing = true
"#
        )
        .unwrap();

        let config = without_env(|| Config::load_from_path(file.path())).unwrap();

        assert_eq!(config.storage.input_container, "originals");
        assert_eq!(config.storage.output_container, "output");
        assert_eq!(config.thumbnail.size, ThumbnailSize::ExtraSmall);
        assert!(config.trace.synthesize_missing);
    }

    #[test]
    #[serial]
    fn test_image_bucket_sets_both_containers() {
        let config = without_env(|| {
            temp_env::with_var(BUCKET_ENV, Some("images"), || {
                Config::load_from_path("/nonexistent/thumbnail.toml")
            })
        })
        .unwrap();

        assert_eq!(config.storage.input_container, "images");
        assert_eq!(config.storage.output_container, "images");
    }

    #[test]
    #[serial]
    fn test_prefixed_env_overrides_bucket() {
        let config = without_env(|| {
            temp_env::with_vars(
                [
                    (BUCKET_ENV, Some("images")),
                    ("THUMBNAIL_STORAGE__OUTPUT_CONTAINER", Some("thumbs")),
                    ("THUMBNAIL_THUMBNAIL__SIZE", Some("medium")),
                    ("THUMBNAIL_TRACE__SYNTHESIZE_MISSING", Some("true")),
                ],
                || Config::load_from_path("/nonexistent/thumbnail.toml"),
            )
        })
        .unwrap();

        assert_eq!(config.storage.input_container, "images");
        assert_eq!(config.storage.output_container, "thumbs");
        assert_eq!(config.thumbnail.size, ThumbnailSize::Medium);
        assert!(config.trace.synthesize_missing);
    }

    #[test]
    #[serial]
    fn test_invalid_size_is_an_error() {
        let result = without_env(|| {
            temp_env::with_var("THUMBNAIL_THUMBNAIL__SIZE", Some("huge"), || {
                Config::load_from_path("/nonexistent/thumbnail.toml")
            })
        });
        assert!(result.is_err());
    }
}
