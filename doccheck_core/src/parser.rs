use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use derive_more::Deref;
use derive_more::DerefMut;
use serde::Deserialize;
use serde::Serialize;
use snailquote::unescape;

use crate::DoccheckResult;

/// A tag attached to a block through its attribute line. The roles the
/// validator acts on are named variants; anything else lands in
/// [`Role::Other`] and is carried along but ignored.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Role {
	/// Illustrative source that must never be executed.
	Fragment,
	/// Executing the block must produce a non-zero interpreter exit.
	ShouldError,
	/// The block holds expected output rather than sample code.
	Output,
	/// The output block must equal the most recently captured execution
	/// output.
	MatchesPrevious,
	/// A role this harness has no behavior for.
	Other(String),
}

impl From<&str> for Role {
	fn from(name: &str) -> Self {
		match name {
			"fragment" => Self::Fragment,
			"should-error" => Self::ShouldError,
			"output" => Self::Output,
			"matches-previous" => Self::MatchesPrevious,
			other => Self::Other(other.to_string()),
		}
	}
}

impl std::fmt::Display for Role {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Fragment => write!(f, "fragment"),
			Self::ShouldError => write!(f, "should-error"),
			Self::Output => write!(f, "output"),
			Self::MatchesPrevious => write!(f, "matches-previous"),
			Self::Other(name) => write!(f, "{name}"),
		}
	}
}

/// The set of roles attached to one block. Membership matters, order and
/// repetition do not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut, Serialize, Deserialize)]
pub struct Roles(BTreeSet<Role>);

impl FromIterator<Role> for Roles {
	fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// One parsed unit of a documentation file: the text between a pair of
/// identical delimiter lines, plus whatever the preceding attribute line
/// declared about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
	/// The document the block was parsed from.
	pub file_path: PathBuf,
	/// 0-based line number of the closing delimiter, used for error
	/// reporting.
	pub line_no: usize,
	/// Whether the attribute line declared this block as executable sample
	/// code.
	pub is_source: bool,
	/// Role tags drawn from the attribute line.
	pub roles: Roles,
	/// The literal text between the delimiters, newline-joined, trailing
	/// whitespace trimmed.
	pub contents: String,
}

impl CodeBlock {
	/// Whether the validator should hand this block to the process runner.
	/// Tab-indented and `fragment` blocks illustrate syntax only.
	pub fn is_executable(&self) -> bool {
		self.is_source
			&& !self.contents.starts_with('\t')
			&& !self.roles.contains(&Role::Fragment)
	}

	/// Whether this block carries expected output to compare.
	pub fn is_output(&self) -> bool {
		self.roles.contains(&Role::Output)
	}
}

/// Pending `is_source`/`roles` captured from an attribute line. An attribute
/// line only applies to the block or line immediately following it, so the
/// scanning loop clears this state whenever a plain line goes by.
#[derive(Debug, Default)]
struct AttributeState {
	is_source: bool,
	roles: Roles,
}

impl AttributeState {
	fn clear(&mut self) {
		self.is_source = false;
		self.roles.clear();
	}

	/// Parse a `[...]` attribute line, replacing any previously pending
	/// state. Role attributes have two syntaxes to handle: the `.a.b`
	/// shorthand and the `role="a b"` key form.
	fn absorb(&mut self, line: &str) {
		self.clear();
		let line = line.trim_start_matches('[').trim_end_matches(']');
		for attr in line.split(',') {
			if attr == "source" {
				self.is_source = true;
			} else if let Some(shorthand) = attr.strip_prefix('.') {
				self.roles.extend(shorthand.split('.').map(Role::from));
			} else if let Some((key, value)) = attr.split_once('=') {
				if key == "role" {
					let value =
						unescape(value).unwrap_or_else(|_| value.trim_matches('"').to_string());
					self.roles.extend(value.split(' ').map(Role::from));
				}
			}
		}
	}
}

/// A line that opens (and, repeated verbatim, closes) a delimited block:
/// a fence of three or more backticks or a rule of four or more dashes.
fn is_delimiter(line: &str) -> bool {
	line.starts_with("```") || line.starts_with("----")
}

/// Parse the code blocks out of one documentation file's content.
///
/// This is far from a complete parser for the markup language; it supports
/// just the subset the documentation uses in practice: an optional `[...]`
/// attribute line followed by a fenced or ruled block whose closing line
/// repeats the opening line exactly. A block whose closing delimiter never
/// appears is dropped without a record.
pub fn parse_blocks(file_path: &Path, content: &str) -> Vec<CodeBlock> {
	let mut blocks = Vec::new();
	let mut open_delimiter: Option<String> = None;
	let mut pending = AttributeState::default();
	let mut lines: Vec<String> = Vec::new();

	for (line_no, raw) in content.lines().enumerate() {
		let line = raw.trim_end();
		if open_delimiter.as_deref() == Some(line) {
			// Got a matching delimiter; close the open block.
			blocks.push(CodeBlock {
				file_path: file_path.to_path_buf(),
				line_no,
				is_source: pending.is_source,
				roles: pending.roles.clone(),
				contents: lines.join("\n").trim_end().to_string(),
			});
			open_delimiter = None;
			lines.clear();
		} else if open_delimiter.is_some() {
			lines.push(line.to_string());
		} else if line.starts_with('[') {
			pending.absorb(line);
		} else if is_delimiter(line) {
			open_delimiter = Some(line.to_string());
		} else {
			pending.clear();
		}
	}

	tracing::trace!(
		file = %file_path.display(),
		blocks = blocks.len(),
		"parsed documentation file"
	);
	blocks
}

/// Read and parse one documentation file.
pub fn parse_file(file_path: &Path) -> DoccheckResult<Vec<CodeBlock>> {
	let content = std::fs::read_to_string(file_path)?;
	Ok(parse_blocks(file_path, &content))
}
