use std::path::Path;
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::time::Duration;

use clap::CommandFactory;
use clap::Parser;
use doccheck_cli::Commands;
use doccheck_cli::DoccheckCli;
use doccheck_cli::OutputFormat;
use doccheck_core::AnyResult;
use doccheck_core::BlockError;
use doccheck_core::CommandTemplate;
use doccheck_core::DiscoveryOptions;
use doccheck_core::DoccheckConfig;
use doccheck_core::InterpreterRunner;
use doccheck_core::check_docs;
use owo_colors::OwoColorize;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = DoccheckCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_writer(std::io::stderr)
		.init();

	let result = match args.command {
		Some(Commands::Doc {
			ref directory,
			ref library,
			format,
			watch,
		}) => run_doc(&args, directory.as_deref(), library, format, watch),
		None => {
			DoccheckCli::command().print_help().ok();
			process::exit(1);
		}
	};

	match result {
		Ok(false) => {}
		Ok(true) => process::exit(1),
		Err(e) => {
			// Try to render through miette for rich diagnostics with help
			// text and error codes.
			match e.downcast::<doccheck_core::DoccheckError>() {
				Ok(doccheck_err) => {
					let report: miette::Report = (*doccheck_err).into();
					eprintln!("{report:?}");
				}
				Err(e) => {
					eprintln!("{} {e}", colored!("error:", red));
				}
			}
			process::exit(2);
		}
	}
}

fn resolve_root(args: &DoccheckCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn resolve_dir(root: &Path, directory: &Path) -> PathBuf {
	if directory.is_absolute() {
		directory.to_path_buf()
	} else {
		root.join(directory)
	}
}

fn interpreter_runner(
	template: CommandTemplate,
	config: &DoccheckConfig,
	root: &Path,
) -> InterpreterRunner {
	InterpreterRunner::new(
		template,
		config.interpreter.timeout(),
		config.interpreter.sample_extension.as_str(),
	)
	.with_working_dir(root)
}

/// Run the doc check, returning whether any discrepancy was found
/// (true = discrepancies).
fn run_doc(
	args: &DoccheckCli,
	directory: Option<&Path>,
	libraries: &[PathBuf],
	format: OutputFormat,
	watch: bool,
) -> AnyResult<bool> {
	// Run the initial check.
	let has_errors = run_doc_once(args, directory, libraries, format)?;

	if !watch {
		return Ok(has_errors);
	}

	// Watch mode
	println!("\nWatching for file changes... (press Ctrl+C to stop)");

	let root = resolve_root(args);
	let (tx, rx) = mpsc::channel();

	let mut watcher =
		notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
			if let Ok(event) = res {
				if matches!(
					event.kind,
					notify::EventKind::Modify(_) | notify::EventKind::Create(_)
				) {
					let _ = tx.send(());
				}
			}
		})?;

	use notify::Watcher;
	watcher.watch(&root, notify::RecursiveMode::Recursive)?;

	loop {
		rx.recv()?;
		// Debounce: drain additional events within 200ms.
		while rx.recv_timeout(Duration::from_millis(200)).is_ok() {}

		println!("\nFile change detected, checking...");
		if let Err(e) = run_doc_once(args, directory, libraries, format) {
			eprintln!("{} {e}", colored!("error:", red));
		}
	}
}

/// Run a single doc check and report every discrepancy found.
fn run_doc_once(
	args: &DoccheckCli,
	directory: Option<&Path>,
	libraries: &[PathBuf],
	format: OutputFormat,
) -> AnyResult<bool> {
	let root = resolve_root(args);
	let config = DoccheckConfig::load_or_default(&root)?;
	let discovery = DiscoveryOptions {
		extension: config.docs.extension.clone(),
		exclude_patterns: config.exclude.patterns.clone(),
		disable_gitignore: config.disable_gitignore,
	};

	let errors = match directory {
		Some(directory) => {
			let directory = resolve_dir(&root, directory);
			let mut template = CommandTemplate::new(&config.interpreter.command)?;
			for library in libraries {
				template.push_literal(library.display().to_string());
			}
			let runner = interpreter_runner(template, &config, &root);
			check_docs(&directory, &runner, &discovery)?
		}
		None => {
			// Language manual with the bare interpreter, then the library
			// manual with the standard library appended to the command.
			let template = CommandTemplate::new(&config.interpreter.command)?;
			let runner = interpreter_runner(template.clone(), &config, &root);
			let mut errors = check_docs(&root.join(&config.docs.lang_root), &runner, &discovery)?;

			let mut lib_template = template;
			lib_template.push_literal(config.docs.library.clone());
			let lib_runner = interpreter_runner(lib_template, &config, &root);
			errors.extend(check_docs(
				&root.join(&config.docs.lib_root),
				&lib_runner,
				&discovery,
			)?);
			errors
		}
	};

	match format {
		OutputFormat::Text => {
			for error in &errors {
				println!("{error}");
			}
		}
		OutputFormat::Json => {
			print_json(&errors);
		}
	}

	if args.verbose {
		if errors.is_empty() {
			eprintln!("{}", colored!("documentation checks passed", bold));
		} else {
			eprintln!(
				"{}",
				colored!(format!("{} discrepancy(ies) found", errors.len()), bold)
			);
		}
	}

	Ok(!errors.is_empty())
}

fn print_json(errors: &[BlockError]) {
	let entries: Vec<serde_json::Value> = errors
		.iter()
		.map(|error| {
			serde_json::json!({
				"file": error.file_name,
				"line": error.line_no,
				"kind": error.kind.to_string(),
				"message": error.error,
			})
		})
		.collect();
	let output = serde_json::json!({
		"ok": errors.is_empty(),
		"errors": entries,
	});
	println!("{output}");
}
