use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Check that the code samples in the documentation behave as documented.",
	long_about = "doccheck scans documentation files for embedded code samples and expected \
	              outputs, executes each sample against the configured language interpreter, and \
	              verifies that actual behavior (success, failure, and literal output) matches \
	              what the documentation claims.\n\nQuick start:\n  doccheck doc            Check \
	              the default documentation roots\n  doccheck doc DIR        Check one \
	              documentation directory\n  doccheck doc DIR LIB    Include a library file with \
	              every sample"
)]
pub struct DoccheckCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory (where doccheck.toml and the
	/// default documentation trees live).
	#[arg(long, short, global = true)]
	pub path: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Assert that the code blocks in the documentation are valid.
	///
	/// Parses every documentation file into source and output blocks, runs
	/// each executable sample through the interpreter, and reports blocks
	/// whose behavior differs from what the documentation claims: samples
	/// that fail where success is documented (and vice versa), samples that
	/// run past the time budget, and expected-output blocks that no longer
	/// match.
	///
	/// If no directory is specified, the default language and library
	/// manual roots are checked, the latter with the standard library
	/// appended to the interpreter command. Exits with a non-zero status
	/// when any discrepancy is found, which makes this suitable for CI.
	Doc {
		/// Documentation directory to process.
		directory: Option<PathBuf>,

		/// Additional library files to include with all examples.
		library: Vec<PathBuf>,

		/// Output format for check results. Use `text` for the plain
		/// one-line-per-discrepancy listing or `json` for programmatic
		/// consumption.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,

		/// Watch for file changes and re-run the checks automatically.
		#[arg(long, default_value_t = false)]
		watch: bool,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Plain text: one `<file>, line <n>: <message>` line per discrepancy.
	Text,
	/// JSON output for programmatic consumption. Each entry includes the
	/// file path, line number, discrepancy kind, and message.
	Json,
}
