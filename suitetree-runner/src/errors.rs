// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by suitetree.

use crate::result::TestStatus;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::borrow::Cow;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse suitetree config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error which indicates that a profile was requested but not known to suitetree.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// Error returned while parsing a [`TestStatus`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for test status: {input}\n(known values: {})",
    TestStatus::variants().join(", "),
)]
pub struct TestStatusParseError {
    input: String,
}

impl TestStatusParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error reported by a test framework while loading a test collection.
#[derive(Debug, Error)]
#[error("failed to load test collection `{collection}`")]
pub struct FrameworkError {
    collection: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl FrameworkError {
    /// Creates a new `FrameworkError` for the named collection.
    pub fn new(
        collection: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            collection: collection.into(),
            source: source.into(),
        }
    }

    /// Returns the name of the collection that failed to load.
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

/// A framework-level fault during execution.
///
/// Failures of individual tests are reported as [`TestResult`](crate::result::TestResult)
/// statuses, not as this error. An `ExecuteError` means the framework couldn't produce a
/// result tree at all.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecuteError {
    /// The framework reported a fault.
    #[error("test framework faulted: {message}")]
    Fault {
        /// A description of the fault.
        message: Cow<'static, str>,
    },

    /// The execution task panicked or was aborted.
    #[error("execution task did not complete")]
    TaskFailed(#[source] tokio::task::JoinError),
}

impl ExecuteError {
    /// Creates a new fault with the given message.
    pub fn fault(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }
}

/// An error that occurred while installing the log subscriber.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LogInitError {
    /// The log environment variable wasn't valid Unicode.
    #[error("{var} is not valid UTF-8")]
    NotUnicode {
        /// The name of the environment variable.
        var: &'static str,
    },

    /// The log environment variable couldn't be parsed as a list of targets.
    #[error("unable to parse {var}={value:?}")]
    InvalidTargets {
        /// The name of the environment variable.
        var: &'static str,
        /// The value that failed to parse.
        value: String,
        /// The parse error.
        #[source]
        error: tracing_subscriber::filter::ParseError,
    },

    /// Another global subscriber was installed first.
    #[error("a global log subscriber is already installed")]
    AlreadyInstalled(#[source] tracing_subscriber::util::TryInitError),
}
