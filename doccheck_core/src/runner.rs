use std::ffi::OsString;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Child;
use std::process::Command;
use std::process::ExitStatus;
use std::process::Stdio;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use regex::Regex;

use crate::CodeBlock;
use crate::DoccheckError;
use crate::DoccheckResult;

/// Interpreter-reported line numbers count two lines of session preamble
/// ahead of the sample's first line.
const LINE_PREAMBLE: i64 = 2;

/// One element of an interpreter command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateArg {
	/// A fixed argument passed through verbatim.
	Literal(String),
	/// Replaced with the path of the temporary sample file.
	SamplePath,
}

/// An interpreter invocation with exactly one sample-file placeholder.
/// Literal arguments appended after construction (library files) trail the
/// sample path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
	args: Vec<TemplateArg>,
}

impl CommandTemplate {
	/// Build a template from the interpreter binary and its fixed flags.
	/// The sample-path placeholder is appended after the flags.
	pub fn new(command: &[String]) -> DoccheckResult<Self> {
		if command.is_empty() {
			return Err(DoccheckError::EmptyCommand);
		}
		let mut args: Vec<TemplateArg> = command
			.iter()
			.cloned()
			.map(TemplateArg::Literal)
			.collect();
		args.push(TemplateArg::SamplePath);
		Ok(Self { args })
	}

	/// Append a trailing literal argument, e.g. an extra library file.
	pub fn push_literal(&mut self, arg: impl Into<String>) {
		self.args.push(TemplateArg::Literal(arg.into()));
	}

	/// The interpreter's base name, used in reported messages.
	pub fn display_name(&self) -> String {
		match self.args.first() {
			Some(TemplateArg::Literal(program)) => Path::new(program)
				.file_name()
				.map_or_else(|| program.clone(), |name| name.to_string_lossy().into_owned()),
			_ => "interpreter".to_string(),
		}
	}

	/// Substitute the sample path into the placeholder slot.
	pub fn resolve(&self, sample: &Path) -> Vec<OsString> {
		self.args
			.iter()
			.map(|arg| {
				match arg {
					TemplateArg::Literal(value) => OsString::from(value),
					TemplateArg::SamplePath => sample.as_os_str().to_os_string(),
				}
			})
			.collect()
	}
}

/// An `Error: <file>, line <n>: <message>` line reported by the
/// interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterError {
	pub file: String,
	pub line: i64,
	pub message: String,
}

/// Return code and classified stdout of a finished interpreter session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedRun {
	pub return_code: i32,
	/// Lines the interpreter reported as errors, in stdout order.
	pub errors: Vec<InterpreterError>,
	/// Lines the interpreter reported as warnings.
	pub warnings: Vec<String>,
	/// Every other stdout line, in order.
	pub output: Vec<String>,
}

/// Classified result of one interpreter session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RunOutcome {
	/// The process exited within the time budget.
	Completed(CompletedRun),
	/// The wall-clock budget elapsed; the process was killed, not retried.
	TimedOut,
}

/// What one sample execution produced, along with the sample path the
/// interpreter saw. The validator needs that path to map reported file
/// names back to the originating document.
#[derive(Debug, Clone)]
pub struct RunReport {
	pub sample_path: PathBuf,
	pub outcome: RunOutcome,
}

/// Capability seam for executing one source block. The real implementation
/// spawns the interpreter; tests substitute a scripted stand-in to drive
/// the validator without a process dependency.
pub trait SampleRunner {
	fn run(&self, block: &CodeBlock) -> DoccheckResult<RunReport>;

	/// Name used when reporting interpreter-level discrepancies.
	fn display_name(&self) -> String {
		"interpreter".to_string()
	}
}

/// Splits interpreter stdout into error tuples, warnings, and ordinary
/// output lines.
#[derive(Debug)]
pub struct OutputClassifier {
	error_line: Regex,
	warning_line: Regex,
}

impl Default for OutputClassifier {
	fn default() -> Self {
		Self::new()
	}
}

impl OutputClassifier {
	pub fn new() -> Self {
		Self {
			error_line: Regex::new(r"^Error: ([^,]+), line ([0-9]+): (.+)$")
				.expect("hard-coded pattern compiles"),
			warning_line: Regex::new(r"^Warning: (.+)$").expect("hard-coded pattern compiles"),
		}
	}

	/// Classify a finished session's stdout, line by line.
	pub fn classify(&self, return_code: i32, stdout: &str) -> CompletedRun {
		let mut run = CompletedRun {
			return_code,
			..CompletedRun::default()
		};
		for line in stdout.lines() {
			if let Some(captures) = self.error_line.captures(line) {
				run.errors.push(InterpreterError {
					file: captures[1].to_string(),
					line: captures[2].parse::<i64>().unwrap_or_default() - LINE_PREAMBLE,
					message: captures[3].to_string(),
				});
			} else if let Some(captures) = self.warning_line.captures(line) {
				run.warnings.push(captures[1].to_string());
			} else {
				run.output.push(line.to_string());
			}
		}
		run
	}
}

/// Runs source blocks through the external interpreter, one bounded
/// subprocess per block.
#[derive(Debug)]
pub struct InterpreterRunner {
	template: CommandTemplate,
	timeout: Duration,
	sample_extension: String,
	working_dir: Option<PathBuf>,
	classifier: OutputClassifier,
}

impl InterpreterRunner {
	pub fn new(
		template: CommandTemplate,
		timeout: Duration,
		sample_extension: impl Into<String>,
	) -> Self {
		Self {
			template,
			timeout,
			sample_extension: sample_extension.into(),
			working_dir: None,
			classifier: OutputClassifier::new(),
		}
	}

	/// Launch the interpreter from `dir` so relative binary and library
	/// paths resolve against the project root rather than the caller's
	/// current directory.
	pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
		self.working_dir = Some(dir.into());
		self
	}

	/// Write the block's contents to a scoped temporary file. The suffix
	/// carries the document's base name so interpreter messages stay
	/// recognizable.
	fn write_sample(&self, block: &CodeBlock) -> DoccheckResult<tempfile::NamedTempFile> {
		let stem = block
			.file_path
			.file_stem()
			.map_or_else(|| "sample".to_string(), |stem| stem.to_string_lossy().into_owned());
		let mut sample = tempfile::Builder::new()
			.prefix("doccheck-")
			.suffix(&format!(".{stem}.{}", self.sample_extension))
			.tempfile()?;
		sample.write_all(block.contents.as_bytes())?;
		sample.flush()?;
		Ok(sample)
	}
}

impl SampleRunner for InterpreterRunner {
	fn run(&self, block: &CodeBlock) -> DoccheckResult<RunReport> {
		// The temp file is deleted when `sample` drops, on every path out of
		// this function.
		let sample = self.write_sample(block)?;
		let sample_path = sample.path().to_path_buf();

		let mut argv = self.template.resolve(&sample_path).into_iter();
		let Some(program) = argv.next() else {
			return Err(DoccheckError::EmptyCommand);
		};

		let mut command = Command::new(&program);
		command
			.args(argv)
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::piped());
		if let Some(dir) = &self.working_dir {
			command.current_dir(dir);
		}

		tracing::debug!(
			file = %block.file_path.display(),
			line = block.line_no,
			sample = %sample_path.display(),
			"running sample block"
		);

		let mut child = command.spawn().map_err(|err| {
			DoccheckError::InterpreterSpawn {
				command: program.to_string_lossy().into_owned(),
				reason: err.to_string(),
			}
		})?;

		// No interactive input is fed; close stdin right away so the
		// interpreter sees end-of-file instead of waiting on a prompt.
		drop(child.stdin.take());

		let stdout = spawn_capture(child.stdout.take());
		let stderr = spawn_capture(child.stderr.take());

		let outcome = match wait_with_timeout(&mut child, self.timeout)? {
			Some(status) => {
				let stdout_text = join_capture(stdout);
				let stderr_text = join_capture(stderr);
				if !stderr_text.is_empty() {
					tracing::debug!(
						file = %block.file_path.display(),
						line = block.line_no,
						"interpreter stderr: {}",
						stderr_text.trim_end()
					);
				}
				// Signal terminations carry no code and count as failures.
				let return_code = status.code().unwrap_or(-1);
				RunOutcome::Completed(self.classifier.classify(return_code, &stdout_text))
			}
			None => {
				join_capture(stdout);
				join_capture(stderr);
				RunOutcome::TimedOut
			}
		};

		Ok(RunReport {
			sample_path,
			outcome,
		})
	}

	fn display_name(&self) -> String {
		self.template.display_name()
	}
}

/// Drain a captured pipe on its own thread so a chatty interpreter cannot
/// fill the pipe buffer and deadlock against the timeout loop.
fn spawn_capture<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
	pipe.map(|mut pipe| {
		thread::spawn(move || {
			let mut bytes = Vec::new();
			pipe.read_to_end(&mut bytes).ok();
			String::from_utf8_lossy(&bytes).into_owned()
		})
	})
}

fn join_capture(handle: Option<JoinHandle<String>>) -> String {
	handle
		.and_then(|handle| handle.join().ok())
		.unwrap_or_default()
}

/// Poll the child until it exits or the deadline passes. On timeout the
/// process is killed and reaped, and `None` is returned.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> DoccheckResult<Option<ExitStatus>> {
	let deadline = Instant::now() + timeout;
	loop {
		if let Some(status) = child.try_wait()? {
			return Ok(Some(status));
		}
		if Instant::now() >= deadline {
			child.kill().ok();
			child.wait().ok();
			return Ok(None);
		}
		thread::sleep(Duration::from_millis(10));
	}
}
