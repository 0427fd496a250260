use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;

use crate::SipweaveError;
use crate::SipweaveResult;
use crate::config::SipweaveConfig;
use crate::dispatch::attach_dispatch;
use crate::dispatch::build_dispatch;
use crate::merge::merge;
use crate::model::Scope;
use crate::parser::parse_source;
use crate::sip_parser::parse_sip;
use crate::sip_writer::write_sip;
use crate::transform::SanityWarning;
use crate::transform::SymbolIndex;
use crate::transform::sanity_check;
use crate::transform::transform;

/// Extensions picked up when no headers are named explicitly.
pub const HEADER_EXTENSIONS: [&str; 4] = ["h", "hh", "hpp", "hxx"];

/// Everything a run needs: the project root, its configuration and the
/// headers to process.
#[derive(Debug)]
pub struct GenerationContext {
	pub root: PathBuf,
	pub config: SipweaveConfig,
	/// Absolute header paths, sorted, with excluded headers removed.
	pub headers: Vec<PathBuf>,
}

impl GenerationContext {
	/// Relative header paths are resolved against `root`. When `headers` is
	/// empty every header below `root` is used, skipping hidden entries, the
	/// output directory and anything the project's `.gitignore` ignores.
	/// `[exclude]` patterns apply to both discovered and named headers.
	pub fn new(root: &Path, config: SipweaveConfig, headers: &[PathBuf]) -> SipweaveResult<Self> {
		let exclude = config.exclude_matcher(root)?;

		let mut headers: Vec<PathBuf> = if headers.is_empty() {
			let gitignore = build_gitignore(root);
			let mut found = vec![];
			walk_headers(
				root,
				&root.join(&config.module.output_dir),
				&gitignore,
				&exclude,
				&mut found,
			)?;
			found
		} else {
			headers
				.iter()
				.map(|header| {
					if header.is_absolute() {
						header.clone()
					} else {
						root.join(header)
					}
				})
				.filter(|header| !is_excluded(&exclude, root, header))
				.collect()
		};
		headers.sort();
		headers.dedup();

		Ok(Self {
			root: root.to_path_buf(),
			config,
			headers,
		})
	}

	/// Load `sipweave.toml` from `root`, falling back to defaults.
	pub fn load(root: &Path, headers: &[PathBuf]) -> SipweaveResult<Self> {
		let config = SipweaveConfig::load(root)?.unwrap_or_default();
		Self::new(root, config, headers)
	}

	pub fn output_dir(&self) -> PathBuf {
		self.root.join(&self.config.module.output_dir)
	}

	/// The `.sip` file generated for `header`.
	pub fn output_path(&self, header: &Path) -> PathBuf {
		let stem = header
			.file_stem()
			.map(|stem| stem.to_string_lossy().into_owned())
			.unwrap_or_default();
		self.output_dir().join(format!("{stem}.sip"))
	}

	pub fn index_path(&self) -> PathBuf {
		self.output_dir()
			.join(format!("{}mod.sip", self.config.module_name(&self.root)))
	}
}

/// Matcher for the `.gitignore` at the project root, if there is one.
fn build_gitignore(root: &Path) -> Gitignore {
	let mut builder = GitignoreBuilder::new(root);
	let path = root.join(".gitignore");
	if path.is_file() {
		if let Some(error) = builder.add(&path) {
			tracing::warn!("ignoring unreadable {}: {error}", path.display());
		}
	}
	builder.build().unwrap_or_else(|_| Gitignore::empty())
}

/// Whether an explicitly named header falls under an `[exclude]` pattern,
/// either directly or through one of its directories.
fn is_excluded(exclude: &Gitignore, root: &Path, header: &Path) -> bool {
	let excluded = header.starts_with(root)
		&& exclude
			.matched_path_or_any_parents(header, false)
			.is_ignore();
	if excluded {
		tracing::debug!("excluding {}", header.display());
	}
	excluded
}

fn walk_headers(
	directory: &Path,
	output_dir: &Path,
	gitignore: &Gitignore,
	exclude: &Gitignore,
	found: &mut Vec<PathBuf>,
) -> SipweaveResult<()> {
	for entry in std::fs::read_dir(directory)? {
		let path = entry?.path();
		let hidden = path
			.file_name()
			.is_some_and(|name| name.to_string_lossy().starts_with('.'));
		if hidden || path == output_dir {
			continue;
		}

		let is_dir = path.is_dir();
		if gitignore.matched(&path, is_dir).is_ignore() {
			continue;
		}
		if exclude.matched(&path, is_dir).is_ignore() {
			tracing::debug!("excluding {}", path.display());
			continue;
		}

		if is_dir {
			walk_headers(&path, output_dir, gitignore, exclude, found)?;
		} else if path
			.extension()
			.is_some_and(|extension| HEADER_EXTENSIONS.iter().any(|known| extension == *known))
		{
			found.push(path);
		}
	}

	Ok(())
}

/// A file produced by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
	/// The header the file was generated from. `None` for the index file.
	pub header: Option<PathBuf>,
	pub path: PathBuf,
	/// The content on disk before the run, if the file existed.
	pub previous: Option<String>,
	pub content: String,
}

impl GeneratedFile {
	pub fn is_changed(&self) -> bool {
		self.previous.as_deref() != Some(self.content.as_str())
	}
}

#[derive(Debug, Default)]
pub struct GenerateResult {
	/// One entry per header in header order, then the index file.
	pub files: Vec<GeneratedFile>,
}

impl GenerateResult {
	pub fn changed(&self) -> impl Iterator<Item = &GeneratedFile> {
		self.files.iter().filter(|file| file.is_changed())
	}

	/// Returns true if every file on disk matches what a run would write.
	pub fn is_up_to_date(&self) -> bool {
		self.changed().next().is_none()
	}
}

/// Preprocess, tokenize and parse one header.
pub fn parse_header(path: &Path, text: &str, config: &SipweaveConfig) -> SipweaveResult<Scope> {
	let mut preprocessor = config.preprocessor()?;
	let preprocessed = preprocessor.preprocess(text);
	let scope = parse_source(&preprocessed, Some(path), &config.lexer_options())?;
	Ok(scope)
}

/// The preprocessed text of one header, as the tokenizer sees it.
pub fn preprocess_file(path: &Path, config: &SipweaveConfig) -> SipweaveResult<String> {
	let text = read_header(path)?;
	let mut preprocessor = config.preprocessor()?;
	Ok(preprocessor.preprocess(&text))
}

fn read_header(path: &Path) -> SipweaveResult<String> {
	std::fs::read_to_string(path).map_err(|e| {
		SipweaveError::HeaderRead {
			path: path.display().to_string(),
			reason: e.to_string(),
		}
	})
}

struct Output {
	header: PathBuf,
	path: PathBuf,
	previous: Option<String>,
	scope: Scope,
}

/// Run the pipeline up to the final trees, one per header.
fn build_outputs(ctx: &GenerationContext) -> SipweaveResult<Vec<Output>> {
	if ctx.headers.is_empty() {
		return Err(SipweaveError::NoHeaders);
	}

	let mut sources = Vec::with_capacity(ctx.headers.len());
	for header in &ctx.headers {
		tracing::debug!("parsing {}", header.display());
		let text = read_header(header)?;
		sources.push(parse_header(header, &text, &ctx.config)?);
	}

	let index = SymbolIndex::build(&sources.iter().collect::<Vec<_>>());
	let options = ctx.config.transform_options()?;
	let candidates: Vec<Scope> = ctx
		.headers
		.iter()
		.zip(&sources)
		.map(|(header, source)| transform(source, &options, &index, header))
		.collect();

	let trees = build_dispatch(
		&ctx.headers
			.iter()
			.map(PathBuf::as_path)
			.zip(&candidates)
			.collect::<Vec<_>>(),
		&ctx.config.dispatch_options(),
	);

	let mut outputs = Vec::with_capacity(candidates.len());
	for (header, candidate) in ctx.headers.iter().zip(candidates) {
		let path = ctx.output_path(header);
		let previous = if path.is_file() {
			Some(std::fs::read_to_string(&path)?)
		} else {
			None
		};

		let scope = match &previous {
			Some(text) => {
				tracing::debug!("merging into {}", path.display());
				let previous_tree = parse_sip(text, Some(&path))?;
				merge(&previous_tree, &candidate)
			}
			None => candidate,
		};

		outputs.push(Output {
			header: header.clone(),
			path,
			previous,
			scope,
		});
	}

	let mut scopes: Vec<Scope> = outputs
		.iter_mut()
		.map(|output| std::mem::take(&mut output.scope))
		.collect();
	attach_dispatch(&mut scopes, &trees);
	for (output, scope) in outputs.iter_mut().zip(scopes) {
		output.scope = scope;
	}

	Ok(outputs)
}

/// Regenerate every `.sip` file of the run and the index file without
/// touching the disk.
pub fn generate(ctx: &GenerationContext) -> SipweaveResult<GenerateResult> {
	let outputs = build_outputs(ctx)?;
	let output_dir = ctx.output_dir();

	let includes: Vec<String> = outputs
		.iter()
		.map(|output| {
			output
				.path
				.strip_prefix(&output_dir)
				.unwrap_or(&output.path)
				.to_string_lossy()
				.replace('\\', "/")
		})
		.collect();

	let mut files: Vec<GeneratedFile> = outputs
		.into_iter()
		.map(|output| {
			GeneratedFile {
				header: Some(output.header),
				content: write_sip(&output.scope),
				path: output.path,
				previous: output.previous,
			}
		})
		.collect();

	let index_path = ctx.index_path();
	let previous = if index_path.is_file() {
		Some(std::fs::read_to_string(&index_path)?)
	} else {
		None
	};
	files.push(GeneratedFile {
		header: None,
		content: render_index(
			&ctx.config.module_name(&ctx.root),
			&ctx.config.module.imports,
			&includes,
		),
		path: index_path,
		previous,
	});

	Ok(GenerateResult { files })
}

/// The module file: `%Module`, the external `%Import`s and one `%Include`
/// per generated file, sorted.
pub fn render_index(module: &str, imports: &[String], includes: &[String]) -> String {
	let mut output = String::new();
	output.push_str(&format!("%Module(name={module})\n"));

	if !imports.is_empty() {
		output.push('\n');
		for import in imports {
			output.push_str(&format!("%Import {import}\n"));
		}
	}

	let mut includes = includes.to_vec();
	includes.sort();
	includes.dedup();
	if !includes.is_empty() {
		output.push('\n');
		for include in includes {
			output.push_str(&format!("%Include {include}\n"));
		}
	}

	output
}

/// Write changed files, creating the output directory. Returns the number
/// of files written.
pub fn write_updates(result: &GenerateResult) -> SipweaveResult<usize> {
	let mut written = 0;

	for file in result.changed() {
		if let Some(parent) = file.path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&file.path, &file.content)?;
		written += 1;
	}

	Ok(written)
}

/// Run the pipeline and check the final trees for arguments that need a
/// direction annotation.
pub fn sanity(ctx: &GenerationContext) -> SipweaveResult<Vec<SanityWarning>> {
	let outputs = build_outputs(ctx)?;
	Ok(outputs
		.iter()
		.flat_map(|output| sanity_check(&output.scope))
		.collect())
}
