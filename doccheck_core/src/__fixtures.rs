use std::cell::RefCell;
use std::path::Path;
use std::path::PathBuf;

use crate::CodeBlock;
use crate::DoccheckResult;
use crate::Role;
use crate::Roles;
use crate::runner::CompletedRun;
use crate::runner::InterpreterError;
use crate::runner::RunOutcome;
use crate::runner::RunReport;
use crate::runner::SampleRunner;

/// Path every scripted run pretends to have written its sample to.
pub const SCRIPTED_SAMPLE_PATH: &str = "/tmp/doccheck-scripted.doc.dg";

/// Scripted stand-in for the interpreter: hands out queued outcomes in
/// order and records every block it was asked to run.
pub struct ScriptedRunner {
	outcomes: RefCell<Vec<RunOutcome>>,
	invocations: RefCell<Vec<String>>,
}

impl ScriptedRunner {
	pub fn new(outcomes: Vec<RunOutcome>) -> Self {
		Self {
			outcomes: RefCell::new(outcomes),
			invocations: RefCell::new(Vec::new()),
		}
	}

	pub fn invocation_count(&self) -> usize {
		self.invocations.borrow().len()
	}

	pub fn invocations(&self) -> Vec<String> {
		self.invocations.borrow().clone()
	}
}

impl SampleRunner for ScriptedRunner {
	fn run(&self, block: &CodeBlock) -> DoccheckResult<RunReport> {
		self.invocations.borrow_mut().push(block.contents.clone());
		let mut outcomes = self.outcomes.borrow_mut();
		let outcome = if outcomes.is_empty() {
			success(&[])
		} else {
			outcomes.remove(0)
		};
		Ok(RunReport {
			sample_path: PathBuf::from(SCRIPTED_SAMPLE_PATH),
			outcome,
		})
	}

	fn display_name(&self) -> String {
		"scripted".to_string()
	}
}

pub fn success(output: &[&str]) -> RunOutcome {
	RunOutcome::Completed(CompletedRun {
		return_code: 0,
		output: output.iter().map(ToString::to_string).collect(),
		..CompletedRun::default()
	})
}

pub fn failure(return_code: i32) -> RunOutcome {
	RunOutcome::Completed(CompletedRun {
		return_code,
		..CompletedRun::default()
	})
}

pub fn failure_with_report(file: &str, line: i64, message: &str) -> RunOutcome {
	RunOutcome::Completed(CompletedRun {
		return_code: 1,
		errors: vec![InterpreterError {
			file: file.to_string(),
			line,
			message: message.to_string(),
		}],
		..CompletedRun::default()
	})
}

pub fn block(contents: &str, is_source: bool, roles: &[Role], line_no: usize) -> CodeBlock {
	CodeBlock {
		file_path: Path::new("manual/modules/lang/pages/intro.adoc").to_path_buf(),
		line_no,
		is_source,
		roles: roles.iter().cloned().collect::<Roles>(),
		contents: contents.to_string(),
	}
}

pub fn source_block(contents: &str) -> CodeBlock {
	block(contents, true, &[], 4)
}

pub fn output_block(contents: &str, matches_previous: bool) -> CodeBlock {
	let roles: &[Role] = if matches_previous {
		&[Role::Output, Role::MatchesPrevious]
	} else {
		&[Role::Output]
	};
	block(contents, false, roles, 10)
}
