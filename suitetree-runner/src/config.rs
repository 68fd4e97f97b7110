// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for suitetree.
//!
//! Configuration is read from an embedded default config, with `.config/suitetree.toml` (or an
//! explicitly specified file) layered on top.

use crate::errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::collections::BTreeMap;
use suitetree_filtering::Filterset;
use tracing::debug;

/// Overall configuration for suitetree.
///
/// This is the root data structure for suitetree configuration. Most runs will use the
/// [`profile`](Self::profile) method to obtain a specific profile.
#[derive(Clone, Debug)]
pub struct SuitetreeConfig {
    workspace_root: Utf8PathBuf,
    default_profile: DefaultProfileImpl,
    other_profiles: BTreeMap<String, CustomProfileImpl>,
}

impl SuitetreeConfig {
    /// The default location of the config within the workspace: `.config/suitetree.toml`.
    pub const CONFIG_PATH: &'static str = ".config/suitetree.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the suitetree config from the given file, or if not specified from
    /// `.config/suitetree.toml` in the workspace root.
    ///
    /// An explicitly specified file must exist; the default location may be absent.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (
                file.to_owned(),
                File::new(file.as_str(), FileFormat::Toml),
            ),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Config::builder()
            .add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(source);
        let mut deserialized = Self::build_and_deserialize_config(builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        let default_profile = deserialized
            .profiles
            .remove(Self::DEFAULT_PROFILE)
            .map(DefaultProfileImpl::new)
            .unwrap_or_default();
        debug!(
            "loaded suitetree config from `{config_file}` ({} custom profiles)",
            deserialized.profiles.len(),
        );

        Ok(Self {
            workspace_root,
            default_profile,
            other_profiles: deserialized.profiles,
        })
    }

    /// Returns the workspace root this config was read relative to.
    pub fn workspace_root(&self) -> &Utf8Path {
        &self.workspace_root
    }

    /// Returns the names of all known profiles, including the default profile.
    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(Self::DEFAULT_PROFILE).chain(
            self.other_profiles
                .keys()
                .map(|name| name.as_str())
                .filter(|name| *name != Self::DEFAULT_PROFILE),
        )
    }

    /// Returns the profile with the given name, or an error if a profile was specified but not
    /// found.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<SuitetreeProfile, ProfileNotFound> {
        let name = name.as_ref();
        let custom = if name == Self::DEFAULT_PROFILE {
            None
        } else {
            Some(
                self.other_profiles
                    .get(name)
                    .ok_or_else(|| ProfileNotFound::new(name, self.profile_names()))?,
            )
        };

        let default_filter = custom
            .and_then(|profile| profile.default_filter.clone())
            .or_else(|| self.default_profile.default_filter.clone());
        let reset_before_run = custom
            .and_then(|profile| profile.reset_before_run)
            .unwrap_or(self.default_profile.reset_before_run);

        Ok(SuitetreeProfile {
            name: name.to_owned(),
            default_filter,
            reset_before_run,
        })
    }

    fn build_and_deserialize_config(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<SuitetreeConfigDeserialize, ConfigParseErrorKind> {
        let config = builder
            .build()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        serde_path_to_error::deserialize(config).map_err(|error| {
            // The config crate also reports the key, which serde_path_to_error already tracks.
            let path = error.path().clone();
            let error = match error.into_inner() {
                ConfigError::At { error, .. } => *error,
                other => other,
            };
            ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                path, error,
            )))
        })
    }
}

/// A suitetree profile, with fallbacks to the default profile applied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SuitetreeProfile {
    name: String,
    default_filter: Option<Filterset>,
    reset_before_run: bool,
}

impl SuitetreeProfile {
    /// Returns the name of the profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the filter applied to the root of a newly loaded collection.
    pub fn default_filter(&self) -> Option<&Filterset> {
        self.default_filter.as_ref()
    }

    /// Returns true if results selected by a run should be cleared before it starts.
    pub fn reset_before_run(&self) -> bool {
        self.reset_before_run
    }

    /// Overrides the default filter.
    pub fn with_default_filter(mut self, default_filter: Option<Filterset>) -> Self {
        self.default_filter = default_filter;
        self
    }

    /// Overrides whether results are cleared before a run.
    pub fn with_reset_before_run(mut self, reset_before_run: bool) -> Self {
        self.reset_before_run = reset_before_run;
        self
    }
}

impl Default for SuitetreeProfile {
    /// Returns the default profile as specified by the embedded default config.
    fn default() -> Self {
        Self {
            name: SuitetreeConfig::DEFAULT_PROFILE.to_owned(),
            default_filter: None,
            reset_before_run: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SuitetreeConfigDeserialize {
    #[serde(default, rename = "profile")]
    profiles: BTreeMap<String, CustomProfileImpl>,
}

#[derive(Clone, Debug, Default)]
struct DefaultProfileImpl {
    default_filter: Option<Filterset>,
    reset_before_run: bool,
}

impl DefaultProfileImpl {
    fn new(profile: CustomProfileImpl) -> Self {
        Self {
            default_filter: profile.default_filter,
            reset_before_run: profile.reset_before_run.unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default)]
    default_filter: Option<Filterset>,
    #[serde(default)]
    reset_before_run: Option<bool>,
}
