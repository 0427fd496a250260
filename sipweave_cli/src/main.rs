use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use owo_colors::OwoColorize;
use similar::ChangeTag;
use similar::TextDiff;
use sipweave_cli::Commands;
use sipweave_cli::OutputFormat;
use sipweave_cli::SipweaveCli;
use sipweave_core::GeneratedFile;
use sipweave_core::GenerationContext;
use sipweave_core::SipweaveConfig;
use sipweave_core::generate;
use sipweave_core::preprocess_file;
use sipweave_core::sanity;
use sipweave_core::write_updates;
use tracing_subscriber::EnvFilter;

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
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = SipweaveCli::parse();

	let use_color = !args.no_color
		&& std::env::var_os("NO_COLOR").is_none()
		&& supports_color::on(supports_color::Stream::Stderr).is_some();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	init_tracing(args.verbose, use_color);

	let result = match &args.command {
		Some(Commands::Generate { headers, dry_run }) => run_generate(&args, headers, *dry_run),
		Some(Commands::Check {
			headers,
			diff,
			format,
		}) => run_check(&args, headers, *diff, *format),
		Some(Commands::Sanity { headers }) => run_sanity(&args, headers),
		Some(Commands::Preprocess { header }) => run_preprocess(&args, header),
		None => {
			eprintln!("No subcommand specified. Run `sipweave --help` for usage.");
			process::exit(1);
		}
	};

	match result {
		Ok(Outcome::Success) => {}
		Ok(Outcome::Failure) => process::exit(1),
		Err(e) => {
			match e.downcast::<sipweave_core::SipweaveError>() {
				Ok(error) => {
					let report: miette::Report = (*error).into();
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

/// Logs go to stderr. `SIPWEAVE_LOG` overrides the level picked by
/// `--verbose`.
fn init_tracing(verbose: bool, use_color: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter =
		EnvFilter::try_from_env("SIPWEAVE_LOG").unwrap_or_else(|_| EnvFilter::new(default_level));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(use_color)
		.with_target(false)
		.without_time()
		.try_init();
}

/// Whether a command that ran to completion found a problem.
enum Outcome {
	Success,
	Failure,
}

type CommandResult = Result<Outcome, Box<dyn std::error::Error>>;

fn resolve_root(args: &SipweaveCli) -> PathBuf {
	args.path
		.clone()
		.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn load_context(args: &SipweaveCli, headers: &[PathBuf]) -> Result<GenerationContext, Box<dyn std::error::Error>> {
	let root = resolve_root(args);
	tracing::debug!("project root {}", root.display());
	let ctx = GenerationContext::load(&root, headers)?;

	if args.verbose {
		println!("Found {} header(s)", ctx.headers.len());
		for header in &ctx.headers {
			println!("  {}", make_relative(header, &root));
		}
	}

	Ok(ctx)
}

fn run_generate(args: &SipweaveCli, headers: &[PathBuf], dry_run: bool) -> CommandResult {
	let ctx = load_context(args, headers)?;
	let result = generate(&ctx)?;
	let changed: Vec<&GeneratedFile> = result.changed().collect();

	if changed.is_empty() {
		println!("All .sip files are already up to date.");
		return Ok(Outcome::Success);
	}

	if dry_run {
		println!("Dry run: would write {} file(s):", changed.len());
		for file in &changed {
			println!("  {} ({})", make_relative(&file.path, &ctx.root), describe_change(file));
		}
		return Ok(Outcome::Success);
	}

	let written = write_updates(&result)?;
	for file in &changed {
		println!("  {} {}", colored!("wrote", green), make_relative(&file.path, &ctx.root));
	}
	println!("Wrote {written} file(s).");

	Ok(Outcome::Success)
}

fn describe_change(file: &GeneratedFile) -> &'static str {
	if file.previous.is_some() {
		"out of date"
	} else {
		"missing"
	}
}

fn run_check(args: &SipweaveCli, headers: &[PathBuf], show_diff: bool, format: OutputFormat) -> CommandResult {
	let ctx = load_context(args, headers)?;
	let result = generate(&ctx)?;
	let stale: Vec<&GeneratedFile> = result.changed().collect();

	if stale.is_empty() {
		match format {
			OutputFormat::Json => println!("{{\"ok\":true,\"stale\":[]}}"),
			OutputFormat::Text => println!("Check passed: all .sip files are up to date."),
		}
		return Ok(Outcome::Success);
	}

	match format {
		OutputFormat::Json => {
			let entries: Vec<serde_json::Value> = stale
				.iter()
				.map(|file| {
					serde_json::json!({
						"file": make_relative(&file.path, &ctx.root),
						"header": file.header.as_deref().map(|header| make_relative(header, &ctx.root)),
						"status": describe_change(file),
					})
				})
				.collect();
			let output = serde_json::json!({
				"ok": false,
				"stale": entries,
			});
			println!("{output}");
		}
		OutputFormat::Text => {
			eprintln!("Check failed.");
			eprintln!();
			eprintln!("Stale files:");
			for file in &stale {
				eprintln!("  {} ({})", make_relative(&file.path, &ctx.root), describe_change(file));
				if show_diff {
					print_diff(file.previous.as_deref().unwrap_or_default(), &file.content);
				}
			}
			eprintln!();
			eprintln!(
				"{} .sip file(s) are out of date. Run `sipweave generate` to fix.",
				stale.len()
			);
		}
	}

	Ok(Outcome::Failure)
}

fn run_sanity(args: &SipweaveCli, headers: &[PathBuf]) -> CommandResult {
	let ctx = load_context(args, headers)?;
	let warnings = sanity(&ctx)?;

	if warnings.is_empty() {
		println!("No sanity problems found.");
		return Ok(Outcome::Success);
	}

	for warning in &warnings {
		println!("{} {warning}", colored!("warning:", yellow));
	}
	println!();
	println!("{} argument(s) need a direction annotation.", warnings.len());

	Ok(Outcome::Failure)
}

fn run_preprocess(args: &SipweaveCli, header: &Path) -> CommandResult {
	let root = resolve_root(args);
	let config = SipweaveConfig::load(&root)?.unwrap_or_default();
	let path = if header.is_absolute() {
		header.to_path_buf()
	} else {
		root.join(header)
	};

	print!("{}", preprocess_file(&path, &config)?);

	Ok(Outcome::Success)
}

fn print_diff(current: &str, expected: &str) {
	let diff = TextDiff::from_lines(current, expected);
	for change in diff.iter_all_changes() {
		match change.tag() {
			ChangeTag::Delete => {
				eprint!("  {}", colored!(format!("-{change}"), red));
			}
			ChangeTag::Insert => {
				eprint!("  {}", colored!(format!("+{change}"), green));
			}
			ChangeTag::Equal => {
				eprint!("   {change}");
			}
		}
	}
}

/// Make a path relative to root for display purposes.
fn make_relative(path: &Path, root: &Path) -> String {
	path.strip_prefix(root)
		.unwrap_or(path)
		.display()
		.to_string()
}
