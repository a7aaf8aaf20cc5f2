use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::DoccheckError;
use crate::DoccheckResult;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["doccheck.toml", ".doccheck.toml", ".config/doccheck.toml"];

/// Default interpreter invocation: binary path plus fixed flags. The sample
/// path and any library files trail these.
pub const DEFAULT_INTERPRETER_COMMAND: [&str; 3] = ["src/dgdebug", "--quit", "--width=1000"];

/// Documentation tree holding the core language manual.
pub const DEFAULT_LANG_DOCS: &str = "manual/modules/lang";

/// Documentation tree holding the standard library manual; checked with
/// [`DEFAULT_LIBRARY`] appended to the interpreter command.
pub const DEFAULT_LIB_DOCS: &str = "manual/modules/lib";

/// Library file included with every example in the library manual.
pub const DEFAULT_LIBRARY: &str = "stdlib.dg";

/// File extension of documentation files.
pub const DEFAULT_DOC_EXTENSION: &str = "adoc";

/// Extension given to temporary sample files.
pub const DEFAULT_SAMPLE_EXTENSION: &str = "dg";

const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Configuration loaded from a `doccheck.toml` file.
///
/// ```toml
/// [interpreter]
/// command = ["src/dgdebug", "--quit", "--width=1000"]
/// timeout_ms = 2000
/// sample_extension = "dg"
///
/// [docs]
/// lang_root = "manual/modules/lang"
/// lib_root = "manual/modules/lib"
/// library = "stdlib.dg"
/// extension = "adoc"
///
/// [exclude]
/// patterns = ["drafts/"]
///
/// disable_gitignore = false
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct DoccheckConfig {
	/// How to invoke the interpreter under test.
	#[serde(default)]
	pub interpreter: InterpreterConfig,
	/// Where the documentation trees live.
	#[serde(default)]
	pub docs: DocsConfig,
	/// Exclusion configuration using gitignore-style patterns.
	#[serde(default)]
	pub exclude: ExcludeConfig,
	/// Whether to disable `.gitignore` integration during discovery.
	#[serde(default)]
	pub disable_gitignore: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InterpreterConfig {
	/// Interpreter binary and its fixed flags; the sample path is appended
	/// after these.
	#[serde(default = "default_command")]
	pub command: Vec<String>,
	/// Wall-clock budget for one interpreter session, in milliseconds.
	#[serde(default = "default_timeout_ms")]
	pub timeout_ms: u64,
	/// Extension given to temporary sample files.
	#[serde(default = "default_sample_extension")]
	pub sample_extension: String,
}

impl Default for InterpreterConfig {
	fn default() -> Self {
		Self {
			command: default_command(),
			timeout_ms: default_timeout_ms(),
			sample_extension: default_sample_extension(),
		}
	}
}

impl InterpreterConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_millis(self.timeout_ms)
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocsConfig {
	/// Root of the language manual, checked with the bare interpreter
	/// command.
	#[serde(default = "default_lang_root")]
	pub lang_root: PathBuf,
	/// Root of the library manual, checked with [`DocsConfig::library`]
	/// appended.
	#[serde(default = "default_lib_root")]
	pub lib_root: PathBuf,
	/// Library file appended when checking the library manual.
	#[serde(default = "default_library")]
	pub library: String,
	/// File extension of documentation files (without the dot).
	#[serde(default = "default_doc_extension")]
	pub extension: String,
}

impl Default for DocsConfig {
	fn default() -> Self {
		Self {
			lang_root: default_lang_root(),
			lib_root: default_lib_root(),
			library: default_library(),
			extension: default_doc_extension(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExcludeConfig {
	/// Gitignore-style patterns excluded from documentation discovery.
	#[serde(default)]
	pub patterns: Vec<String>,
}

impl DoccheckConfig {
	/// Load the config from the first candidate file found under `root`.
	/// Returns `None` when no config file exists.
	pub fn load(root: &Path) -> DoccheckResult<Option<Self>> {
		for candidate in CONFIG_FILE_CANDIDATES {
			let path = root.join(candidate);
			if path.is_file() {
				let raw = std::fs::read_to_string(&path)?;
				let config = toml::from_str(&raw)
					.map_err(|err| DoccheckError::ConfigParse(err.to_string()))?;
				return Ok(Some(config));
			}
		}
		Ok(None)
	}

	/// Load the config, falling back to the built-in defaults when no
	/// config file exists.
	pub fn load_or_default(root: &Path) -> DoccheckResult<Self> {
		Ok(Self::load(root)?.unwrap_or_default())
	}
}

fn default_command() -> Vec<String> {
	DEFAULT_INTERPRETER_COMMAND
		.iter()
		.map(ToString::to_string)
		.collect()
}

fn default_timeout_ms() -> u64 {
	DEFAULT_TIMEOUT_MS
}

fn default_sample_extension() -> String {
	DEFAULT_SAMPLE_EXTENSION.to_string()
}

fn default_lang_root() -> PathBuf {
	PathBuf::from(DEFAULT_LANG_DOCS)
}

fn default_lib_root() -> PathBuf {
	PathBuf::from(DEFAULT_LIB_DOCS)
}

fn default_library() -> String {
	DEFAULT_LIBRARY.to_string()
}

fn default_doc_extension() -> String {
	DEFAULT_DOC_EXTENSION.to_string()
}
