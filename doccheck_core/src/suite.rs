use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::DoccheckError;
use crate::DoccheckResult;
use crate::config::DEFAULT_DOC_EXTENSION;
use crate::parser::parse_file;
use crate::runner::SampleRunner;
use crate::validator::BlockError;
use crate::validator::Validator;

/// Options controlling documentation discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
	/// File extension of documentation files (without the dot).
	pub extension: String,
	/// Gitignore-style patterns to exclude from discovery.
	pub exclude_patterns: Vec<String>,
	/// Whether to disable `.gitignore` integration.
	pub disable_gitignore: bool,
}

impl Default for DiscoveryOptions {
	fn default() -> Self {
		Self {
			extension: DEFAULT_DOC_EXTENSION.to_string(),
			exclude_patterns: Vec::new(),
			disable_gitignore: false,
		}
	}
}

/// Collect the documentation files under `root`, sorted for deterministic
/// checking order.
///
/// Hidden directories are skipped; files matched by the project's
/// `.gitignore` (unless disabled) or by configured exclude patterns are
/// left out.
pub fn collect_doc_files(root: &Path, options: &DiscoveryOptions) -> DoccheckResult<Vec<PathBuf>> {
	if !root.is_dir() {
		return Err(DoccheckError::MissingDocsRoot(root.display().to_string()));
	}

	let gitignore = if options.disable_gitignore {
		Gitignore::empty()
	} else {
		build_gitignore(root)
	};
	let custom_exclude = build_exclude_matcher(root, &options.exclude_patterns)?;

	let mut files = Vec::new();
	walk_dir(root, &options.extension, &gitignore, &custom_exclude, &mut files)?;
	// Sort for deterministic ordering.
	files.sort();
	Ok(files)
}

fn walk_dir(
	dir: &Path,
	extension: &str,
	gitignore: &Gitignore,
	custom_exclude: &Gitignore,
	files: &mut Vec<PathBuf>,
) -> DoccheckResult<()> {
	let entries = std::fs::read_dir(dir)?;

	for entry in entries {
		let entry = entry?;
		let path = entry.path();

		// Skip hidden entries.
		if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
			if name.starts_with('.') {
				continue;
			}
		}

		let is_dir = path.is_dir();

		if gitignore.matched(&path, is_dir).is_ignore() {
			continue;
		}
		if custom_exclude.matched(&path, is_dir).is_ignore() {
			continue;
		}

		if is_dir {
			walk_dir(&path, extension, gitignore, custom_exclude, files)?;
		} else if path.extension().and_then(|ext| ext.to_str()) == Some(extension) {
			files.push(path);
		}
	}

	Ok(())
}

/// Build a `Gitignore` matcher from exclude patterns specified in
/// `doccheck.toml` `[exclude]`. These follow `.gitignore` syntax and are
/// applied on top of any `.gitignore` rules.
fn build_exclude_matcher(root: &Path, patterns: &[String]) -> DoccheckResult<Gitignore> {
	let mut builder = GitignoreBuilder::new(root);
	for pattern in patterns {
		builder.add_line(None, pattern).map_err(|err| {
			DoccheckError::ConfigParse(format!("invalid exclude pattern `{pattern}`: {err}"))
		})?;
	}
	builder
		.build()
		.map_err(|err| DoccheckError::ConfigParse(format!("failed to build exclude rules: {err}")))
}

/// Build a `Gitignore` matcher from the root's `.gitignore` file (if any).
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let gitignore_path = root.join(".gitignore");
	if gitignore_path.exists() {
		let _ = builder.add(gitignore_path);
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Parse and check every documentation file under a directory, returning
/// all discrepancies in discovery order.
///
/// Files are processed strictly one at a time; captured-output state is
/// reset at each file boundary.
pub fn check_docs<R: SampleRunner>(
	root: &Path,
	runner: &R,
	options: &DiscoveryOptions,
) -> DoccheckResult<Vec<BlockError>> {
	let files = collect_doc_files(root, options)?;
	let mut validator = Validator::new(runner);
	let mut errors = Vec::new();
	for file in files {
		let blocks = parse_file(&file)?;
		tracing::debug!(
			file = %file.display(),
			blocks = blocks.len(),
			"checking documentation file"
		);
		errors.extend(validator.check_blocks(&blocks)?);
	}
	Ok(errors)
}
