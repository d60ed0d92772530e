use crate::error::{ErrorKind, Result};
use crate::model::Config;
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "REKIT_";
const ENV_SEPARATOR: &str = "__";
const CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Load every layer: defaults, the user's `config.toml`, `explicit` (if
    /// given) and the environment.
    ///
    /// # Errors
    /// [`ErrorKind::NotFound`] or [`ErrorKind::UnsupportedFormat`] for a bad
    /// explicit file, [`ErrorKind::Load`] when any layer fails to parse.
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::extract(Self::figment(user_config_file().as_deref(), explicit)?)
    }

    /// The layered sources, without extracting them. The user file is
    /// optional; a missing one is skipped.
    pub fn figment(user_file: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = user_file {
            tracing::debug!(path = %path.display(), "Reading user configuration");
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = explicit {
            figment = merge_file(figment, path)?;
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR)))
    }

    pub fn extract(figment: Figment) -> Result<Self> {
        figment.extract::<Config>().or_raise(|| ErrorKind::Load)
    }
}

/// `config.toml` in the platform configuration directory, if there is one.
fn user_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rekit").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
    }
    let extension = path.extension().map(|ext| ext.to_string_lossy().to_lowercase()).unwrap_or_default();
    tracing::debug!(path = %path.display(), format = %extension, "Reading configuration file");
    Ok(match extension.as_str() {
        "toml" => figment.merge(Toml::file(path)),
        "yaml" | "yml" => figment.merge(Yaml::file(path)),
        "json" => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(extension)),
    })
}
