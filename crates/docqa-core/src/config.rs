//! Layered settings: `config.toml`, then the `RUST_ENV` profile file
//! (`config.dev.toml`, `config.prod.toml`, `config.test.toml`), then `APP_*`
//! environment variables with `__` as the nesting separator, e.g.
//! `APP_RETRIEVAL__N_RESULTS=10`.
//!
//! Each crate owns the typed section it reads (`[chunking]`, `[store]`, ...);
//! sections missing from every source fall back to their `Default`.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

/// Profile file for a `RUST_ENV` value; unknown names add no profile.
fn profile_file(env_name: &str) -> Option<&'static str> {
    match env_name {
        "dev" | "development" => Some("config.dev.toml"),
        "prod" | "production" => Some("config.prod.toml"),
        "test" | "testing" => Some("config.test.toml"),
        _ => None,
    }
}

impl Config {
    /// Loads from the working directory.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Loads the config files found in `dir`; absent files are skipped.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        if let Some(profile) = profile_file(&env_name) {
            figment = figment.merge(Toml::file(dir.join(profile)));
        }
        Ok(Self { figment: figment.merge(Env::prefixed("APP_").split("__")) })
    }

    /// Builds a configuration from an inline TOML document only.
    pub fn from_toml_str(toml: &str) -> Self {
        Self { figment: Figment::new().merge(Toml::string(toml)) }
    }

    /// Extracts the `key` section. An absent section yields `T::default()`;
    /// a present but malformed one is an error.
    pub fn section<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: DeserializeOwned + Default,
    {
        if !self.figment.contains(key) {
            return Ok(T::default());
        }
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("[{key}]: {e}")).into())
    }
}

/// Expands `$VAR`/`${VAR}` and a leading `~`. Unset variables are left as
/// written; the result is not canonicalized.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let raw = input.as_ref();
    let with_env = shellexpand::env(raw).unwrap_or(Cow::Borrowed(raw));
    PathBuf::from(shellexpand::tilde(&with_env).as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default, PartialEq)]
    #[serde(default)]
    struct Sample {
        size: usize,
        name: String,
    }

    #[test]
    fn missing_section_falls_back_to_default() {
        let config = Config::from_toml_str("[other]\nx = 1\n");
        let sample: Sample = config.section("sample").expect("section");
        assert_eq!(sample, Sample::default());
    }

    #[test]
    fn present_section_is_extracted_with_defaults_for_gaps() {
        let config = Config::from_toml_str("[sample]\nsize = 7\n");
        let sample: Sample = config.section("sample").expect("section");
        assert_eq!(sample.size, 7);
        assert!(sample.name.is_empty());
    }

    #[test]
    fn malformed_section_is_an_error() {
        let config = Config::from_toml_str("[sample]\nsize = \"seven\"\n");
        assert!(config.section::<Sample>("sample").is_err());
    }

    #[test]
    fn profile_names_map_to_files() {
        assert_eq!(profile_file("production"), Some("config.prod.toml"));
        assert_eq!(profile_file("staging"), None);
    }

    #[test]
    fn load_from_reads_base_file() {
        let dir = tempfile::TempDir::new().expect("tmp");
        std::fs::write(dir.path().join("config.toml"), "[sample]\nsize = 3\nname = \"x\"\n").expect("write");
        let sample: Sample = Config::load_from(dir.path()).expect("load").section("sample").expect("section");
        assert_eq!(sample, Sample { size: 3, name: "x".into() });
    }

    #[test]
    fn unset_variables_are_left_in_place() {
        assert_eq!(expand_path("$DOCQA_SURELY_UNSET_VAR/db"), PathBuf::from("$DOCQA_SURELY_UNSET_VAR/db"));
    }
}
