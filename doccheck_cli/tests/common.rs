use assert_cmd::Command;

pub fn doccheck_cmd() -> Command {
	let mut cmd = Command::cargo_bin("doccheck").expect("doccheck binary builds");
	cmd.env("NO_COLOR", "1");
	cmd
}

/// Write a minimal project: a `doccheck.toml` pointing the interpreter at
/// `cat` (which replays each sample verbatim) and a `docs/` tree for the
/// documentation files.
pub fn write_cat_project(root: &std::path::Path) {
	std::fs::write(
		root.join("doccheck.toml"),
		"[interpreter]\ncommand = [\"cat\"]\n\n[docs]\nlang_root = \"docs/lang\"\nlib_root = \
		 \"docs/lib\"\nlibrary = \"lib.inc\"\n",
	)
	.expect("config written");
	std::fs::create_dir_all(root.join("docs")).expect("docs dir created");
}
