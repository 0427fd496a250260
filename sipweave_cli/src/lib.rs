use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Regenerate SIP binding files from C++ headers without losing hand edits.",
	long_about = "sipweave reads C++ headers and writes the SIP declarations Python bindings \
	              are built from.\n\nEvery run merges the generated declarations into the \
	              .sip files already on disk, so annotations, %MethodCode blocks, //ig and \
	              //force markers survive regeneration.\n\nQuick start:\n  sipweave generate   \
	              Write or refresh the .sip files\n  sipweave check      Verify the .sip files \
	              are up to date\n  sipweave sanity     Report arguments missing /In/ or \
	              /Out/\n  sipweave preprocess Show a header as the parser sees it"
)]
pub struct SipweaveCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Path to the project root directory.
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
	/// Generate the `.sip` file for every header and the module index file.
	///
	/// Headers default to every `.h`, `.hh`, `.hpp` and `.hxx` file below the
	/// project root that no `[exclude]` pattern matches. Existing `.sip`
	/// files are merged with the fresh output, keeping their hand edits.
	Generate {
		/// Headers to process, relative to the project root.
		headers: Vec<PathBuf>,

		/// Preview which files would change without writing them.
		#[arg(long, default_value_t = false)]
		dry_run: bool,
	},
	/// Check that every `.sip` file matches what `generate` would write.
	///
	/// Exits with status 1 when any file is missing or out of date. Ideal
	/// for CI pipelines.
	Check {
		/// Headers to process, relative to the project root.
		headers: Vec<PathBuf>,

		/// Show a unified diff for each stale file.
		#[arg(long, default_value_t = false)]
		diff: bool,

		/// Output format for check results.
		#[arg(long, value_enum, default_value_t = OutputFormat::Text)]
		format: OutputFormat,
	},
	/// Report by-reference arguments without a direction annotation.
	///
	/// Runs the whole pipeline, including the merge with existing `.sip`
	/// files, and lists every non-const reference or pointer to a builtin
	/// type that carries none of `/In/`, `/Out/` or `/InOut/`. Exits with
	/// status 1 when anything is reported.
	Sanity {
		/// Headers to process, relative to the project root.
		headers: Vec<PathBuf>,
	},
	/// Print a header after preprocessing.
	///
	/// The output has the same number of lines as the header, so line
	/// numbers in parse errors can be looked up directly.
	Preprocess {
		/// The header to preprocess, relative to the project root.
		header: PathBuf,
	},
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
	/// Human-readable text output with colors and formatting.
	Text,
	/// JSON output for programmatic consumption. Each stale entry includes
	/// the output path and the header it was generated from.
	Json,
}
