//! Middleware options and derived action naming
//!
//! [`MiddlewareOptions`] is the partial, user-facing configuration. Every
//! field is optional and falls back to its default when resolved into the
//! immutable [`ResolvedOptions`] the middleware actually runs with.
//!
//! ```
//! use async_payload_core::options::{MiddlewareOptions, Stage};
//!
//! let options = MiddlewareOptions::new()
//!     .delimiter("::")
//!     .success_suffix("ok")
//!     .resolve();
//!
//! assert_eq!(options.action_type("load", Stage::Start), "load::start");
//! assert_eq!(options.action_type("load", Stage::Success), "load::ok");
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_DELIMITER: &str = "/";
pub const DEFAULT_START_SUFFIX: &str = "start";
pub const DEFAULT_SUCCESS_SUFFIX: &str = "success";
pub const DEFAULT_ERROR_SUFFIX: &str = "error";

/// A step in the lifecycle of an async payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The work has started
    Start,
    /// The work resolved with a value
    Success,
    /// The work failed
    Error,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Start, Stage::Success, Stage::Error];
}

/// Partial suffix overrides. Unset fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuffixOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// User-facing middleware configuration.
///
/// Deserializes from the camelCase shape
/// `{"delimiter": "::", "suffixes": {"success": "ok"}, "throwOriginalError": false}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MiddlewareOptions {
    /// Inserted between the original type and the lifecycle suffix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
    /// Lifecycle suffixes, merged per field
    #[serde(default)]
    pub suffixes: SuffixOptions,
    /// Re-raise a payload failure to the caller after the error action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throw_original_error: Option<bool>,
}

impl MiddlewareOptions {
    /// Options with every field left at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON document.
    ///
    /// # Example
    /// ```
    /// use async_payload_core::options::MiddlewareOptions;
    ///
    /// let options = MiddlewareOptions::from_json(r#"{"suffixes": {"error": "failed"}}"#).unwrap();
    /// let resolved = options.resolve();
    /// assert_eq!(resolved.suffixes.error, "failed");
    /// assert_eq!(resolved.suffixes.start, "start");
    /// ```
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn start_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.start = Some(suffix.into());
        self
    }

    pub fn success_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.success = Some(suffix.into());
        self
    }

    pub fn error_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.error = Some(suffix.into());
        self
    }

    pub fn throw_original_error(mut self, throw: bool) -> Self {
        self.throw_original_error = Some(throw);
        self
    }

    /// Merge over the defaults, producing the configuration the middleware runs with.
    pub fn resolve(&self) -> ResolvedOptions {
        let defaults = ResolvedOptions::default();
        let pick = |value: &Option<String>, default: String| value.clone().unwrap_or(default);

        ResolvedOptions {
            delimiter: pick(&self.delimiter, defaults.delimiter),
            suffixes: Suffixes {
                start: pick(&self.suffixes.start, defaults.suffixes.start),
                success: pick(&self.suffixes.success, defaults.suffixes.success),
                error: pick(&self.suffixes.error, defaults.suffixes.error),
            },
            throw_original_error: self
                .throw_original_error
                .unwrap_or(defaults.throw_original_error),
        }
    }
}

/// Fully populated lifecycle suffixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suffixes {
    pub start: String,
    pub success: String,
    pub error: String,
}

impl Suffixes {
    pub fn get(&self, stage: Stage) -> &str {
        match stage {
            Stage::Start => &self.start,
            Stage::Success => &self.success,
            Stage::Error => &self.error,
        }
    }
}

impl Default for Suffixes {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_SUFFIX.to_string(),
            success: DEFAULT_SUCCESS_SUFFIX.to_string(),
            error: DEFAULT_ERROR_SUFFIX.to_string(),
        }
    }
}

/// Immutable configuration of an [`AsyncPayloadMiddleware`](crate::AsyncPayloadMiddleware).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub delimiter: String,
    pub suffixes: Suffixes,
    pub throw_original_error: bool,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            suffixes: Suffixes::default(),
            throw_original_error: true,
        }
    }
}

impl From<MiddlewareOptions> for ResolvedOptions {
    fn from(options: MiddlewareOptions) -> Self {
        options.resolve()
    }
}

impl ResolvedOptions {
    /// Derived type for one lifecycle stage of `kind`.
    pub fn action_type(&self, kind: &str, stage: Stage) -> String {
        format!("{}{}{}", kind, self.delimiter, self.suffixes.get(stage))
    }

    /// All three derived types of `kind`.
    pub fn derived_types(&self, kind: &str) -> DerivedTypes {
        DerivedTypes {
            start: self.action_type(kind, Stage::Start),
            success: self.action_type(kind, Stage::Success),
            error: self.action_type(kind, Stage::Error),
        }
    }

    /// Split a derived type back into its original type and stage.
    ///
    /// Returns `None` for types that were not produced by these options.
    ///
    /// # Example
    /// ```
    /// use async_payload_core::options::{ResolvedOptions, Stage};
    ///
    /// let options = ResolvedOptions::default();
    /// assert_eq!(options.parse_action_type("fetchUser/success"), Some(("fetchUser", Stage::Success)));
    /// assert_eq!(options.parse_action_type("fetchUser"), None);
    /// ```
    pub fn parse_action_type<'a>(&self, derived: &'a str) -> Option<(&'a str, Stage)> {
        Stage::ALL.into_iter().find_map(|stage| {
            let kind = derived
                .strip_suffix(self.suffixes.get(stage))?
                .strip_suffix(self.delimiter.as_str())?;
            (!kind.is_empty()).then_some((kind, stage))
        })
    }
}

/// The derived types of one original action type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedTypes {
    pub start: String,
    pub success: String,
    pub error: String,
}

/// Start type of `kind` under the default options.
pub fn start_action_type(kind: &str) -> String {
    ResolvedOptions::default().action_type(kind, Stage::Start)
}

/// Success type of `kind` under the default options.
pub fn success_action_type(kind: &str) -> String {
    ResolvedOptions::default().action_type(kind, Stage::Success)
}

/// Error type of `kind` under the default options.
pub fn error_action_type(kind: &str) -> String {
    ResolvedOptions::default().action_type(kind, Stage::Error)
}
