use std::path::Path;

use similar::ChangeTag;
use similar::TextDiff;

use crate::CodeBlock;
use crate::DoccheckResult;
use crate::Role;
use crate::runner::CompletedRun;
use crate::runner::RunOutcome;
use crate::runner::SampleRunner;

/// The discrepancy taxonomy. Every kind is recorded and reported; none of
/// them aborts the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum BlockErrorKind {
	/// Non-zero interpreter exit where success was expected.
	UnexpectedFailure,
	/// Zero interpreter exit where the block asserted failure.
	UnexpectedSuccess,
	/// The interpreter session ran past its wall-clock budget.
	ExecutionTimeout,
	/// An annotated output block did not equal the captured output.
	OutputMismatch,
	/// An un-annotated output block unexpectedly equaled the captured
	/// output.
	OutputFalsePositive,
}

impl std::fmt::Display for BlockErrorKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::UnexpectedFailure => write!(f, "unexpected-failure"),
			Self::UnexpectedSuccess => write!(f, "unexpected-success"),
			Self::ExecutionTimeout => write!(f, "execution-timeout"),
			Self::OutputMismatch => write!(f, "output-mismatch"),
			Self::OutputFalsePositive => write!(f, "output-false-positive"),
		}
	}
}

/// One detected discrepancy between the documentation and the interpreter.
///
/// `line_no` is signed: interpreter-reported positions are shifted by the
/// session preamble and can land below zero on malformed reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockError {
	pub file_name: String,
	pub line_no: i64,
	pub kind: BlockErrorKind,
	pub error: String,
}

impl std::fmt::Display for BlockError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}, line {}: {}", self.file_name, self.line_no, self.error)
	}
}

/// Per-file checking state machine.
///
/// Output comparisons are only meaningful under strict in-order execution,
/// so blocks are validated one at a time, each interpreter session
/// finishing before the next block is considered.
pub struct Validator<'r, R: SampleRunner> {
	runner: &'r R,
	interpreter: String,
	previous_output: Option<String>,
}

impl<'r, R: SampleRunner> Validator<'r, R> {
	pub fn new(runner: &'r R) -> Self {
		Self {
			runner,
			interpreter: runner.display_name(),
			previous_output: None,
		}
	}

	/// Check one file's blocks in order, collecting every discrepancy.
	/// Captured-output state never crosses file boundaries.
	pub fn check_blocks(&mut self, blocks: &[CodeBlock]) -> DoccheckResult<Vec<BlockError>> {
		self.previous_output = None;
		let mut errors = Vec::new();
		for block in blocks {
			if block.is_executable() {
				self.run_block(block, &mut errors)?;
			}
			if block.is_output() {
				self.check_output(block, &mut errors);
			}
		}
		Ok(errors)
	}

	fn run_block(&mut self, block: &CodeBlock, errors: &mut Vec<BlockError>) -> DoccheckResult<()> {
		self.previous_output = None;
		let should_error = block.roles.contains(&Role::ShouldError);
		let report = self.runner.run(block)?;
		match report.outcome {
			RunOutcome::Completed(run) => {
				for warning in &run.warnings {
					tracing::warn!(
						file = %block.file_path.display(),
						line = block.line_no,
						"interpreter warning: {warning}"
					);
				}
				if run.return_code != 0 && !should_error {
					errors.push(self.failure_error(block, &report.sample_path, &run));
				} else if run.return_code == 0 && should_error {
					errors.push(BlockError {
						file_name: block.file_path.display().to_string(),
						line_no: block.line_no as i64,
						kind: BlockErrorKind::UnexpectedSuccess,
						error: format!("expected error, but {} succeeded", self.interpreter),
					});
				} else {
					self.previous_output = Some(run.output.join("\n").trim().to_string());
				}
			}
			RunOutcome::TimedOut => {
				if !should_error {
					errors.push(BlockError {
						file_name: block.file_path.display().to_string(),
						line_no: block.line_no as i64,
						kind: BlockErrorKind::ExecutionTimeout,
						error: format!("{} timed out", self.interpreter),
					});
				}
			}
		}
		Ok(())
	}

	/// Build an `UnexpectedFailure`, preferring the interpreter's own
	/// report. Positions inside the temporary sample file are mapped back
	/// to the originating document: the file name is rewritten and the
	/// block's line offset added.
	fn failure_error(
		&self,
		block: &CodeBlock,
		sample_path: &Path,
		run: &CompletedRun,
	) -> BlockError {
		match run.errors.first() {
			Some(reported) => {
				let mut file_name = reported.file.clone();
				let mut line_no = reported.line;
				if Path::new(&file_name) == sample_path {
					file_name = block.file_path.display().to_string();
					line_no += block.line_no as i64;
				}
				BlockError {
					file_name,
					line_no,
					kind: BlockErrorKind::UnexpectedFailure,
					error: reported.message.clone(),
				}
			}
			None => {
				BlockError {
					file_name: block.file_path.display().to_string(),
					line_no: block.line_no as i64,
					kind: BlockErrorKind::UnexpectedFailure,
					error: format!("return code {}", run.return_code),
				}
			}
		}
	}

	fn check_output(&mut self, block: &CodeBlock, errors: &mut Vec<BlockError>) {
		let matches_previous = block.roles.contains(&Role::MatchesPrevious);
		let matches = self.previous_output.as_deref() == Some(block.contents.as_str());
		if matches_previous && !matches {
			errors.push(BlockError {
				file_name: block.file_path.display().to_string(),
				line_no: block.line_no as i64,
				kind: BlockErrorKind::OutputMismatch,
				error: mismatch_message(
					&block.contents,
					self.previous_output.as_deref().unwrap_or_default(),
				),
			});
		}
		if !matches_previous && matches {
			errors.push(BlockError {
				file_name: block.file_path.display().to_string(),
				line_no: block.line_no as i64,
				kind: BlockErrorKind::OutputFalsePositive,
				error: "output matches previous: add a .matches-previous annotation to the block \
				        if this is expected"
					.to_string(),
			});
		}
	}
}

/// Render the expected/actual divergence as an indented line diff.
fn mismatch_message(expected: &str, actual: &str) -> String {
	let diff = TextDiff::from_lines(expected, actual);
	let mut lines = Vec::new();
	for change in diff.iter_all_changes() {
		let sign = match change.tag() {
			ChangeTag::Delete => '-',
			ChangeTag::Insert => '+',
			ChangeTag::Equal => ' ',
		};
		lines.push(format!("{sign} {}", change.value().trim_end()));
	}
	format!("output does not match:\n {}", lines.join("\n "))
}
