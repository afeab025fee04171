//! Parser options and their loader.
//!
//! `defaults/haconf.default.toml` is embedded into the crate so the documented
//! defaults and the runtime defaults cannot drift apart. Applications layer their
//! own files and key overrides on top with [`Loader`]; library callers that just
//! want to flip a knob use the builder setters on [`Options`].

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../../defaults/haconf.default.toml");

/// Knobs that change how text is parsed and written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Drop unroutable lines instead of keeping them in the catch-all
    pub disable_unprocessed: bool,
    /// Render with a `# _md5hash=` header
    pub use_md5_hash: bool,
    /// Register `http-check` as a repeatable rule list
    pub use_v2_http_check: bool,
    /// Never infer `from` clauses from the last named defaults section
    pub disable_defaults_inference: bool,
    /// Write defaults headers without names, and no `from` clauses at all
    pub no_named_defaults: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disable_unprocessed(mut self, on: bool) -> Self {
        self.disable_unprocessed = on;
        self
    }

    pub fn use_md5_hash(mut self, on: bool) -> Self {
        self.use_md5_hash = on;
        self
    }

    pub fn use_v2_http_check(mut self, on: bool) -> Self {
        self.use_v2_http_check = on;
        self
    }

    pub fn disable_defaults_inference(mut self, on: bool) -> Self {
        self.disable_defaults_inference = on;
        self
    }

    pub fn no_named_defaults(mut self, on: bool) -> Self {
        self.no_named_defaults = on;
        self
    }
}

#[derive(Debug, Deserialize)]
struct OptionsFile {
    parser: Options,
}

/// Builds [`Options`] from the `[parser]` table: embedded defaults first, then every
/// added TOML file in order, then single-key overrides.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Only `defaults/haconf.default.toml` so far
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Add a TOML file whose `[parser]` keys win over what came before. The file must exist.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Same as [`with_file`](Self::with_file), skipped when nothing is at `path`
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Force one knob, addressed with its table prefix (`parser.use_md5_hash`)
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Merge the layers. Unknown keys are ignored, a wrongly typed one is an error.
    pub fn build(self) -> Result<Options, ConfigError> {
        let file: OptionsFile = self.builder.build()?.try_deserialize()?;
        Ok(file.parser)
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The options `defaults/haconf.default.toml` describes
pub fn load_defaults() -> Result<Options, ConfigError> {
    Loader::new().build()
}
