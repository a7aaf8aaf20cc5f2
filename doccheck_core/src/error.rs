use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum DoccheckError {
	#[error(transparent)]
	#[diagnostic(code(doccheck::io_error))]
	Io(#[from] std::io::Error),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(doccheck::config_parse),
		help(
			"check that doccheck.toml is valid TOML with [interpreter], [docs] and/or [exclude] \
			 sections"
		)
	)]
	ConfigParse(String),

	#[error("interpreter command is empty")]
	#[diagnostic(
		code(doccheck::empty_command),
		help("set `command` under [interpreter] in doccheck.toml to the interpreter binary and its flags")
	)]
	EmptyCommand,

	#[error("failed to launch interpreter `{command}`: {reason}")]
	#[diagnostic(
		code(doccheck::interpreter_spawn),
		help("check that the interpreter binary exists and is executable")
	)]
	InterpreterSpawn { command: String, reason: String },

	#[error("documentation root `{0}` is not a directory")]
	#[diagnostic(
		code(doccheck::missing_docs_root),
		help("pass an existing directory, or set the roots under [docs] in doccheck.toml")
	)]
	MissingDocsRoot(String),
}

pub type DoccheckResult<T> = Result<T, DoccheckError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
