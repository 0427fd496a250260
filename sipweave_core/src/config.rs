use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use ignore::gitignore::Gitignore;
use ignore::gitignore::GitignoreBuilder;
use serde::Deserialize;

use crate::SipweaveError;
use crate::SipweaveResult;
use crate::dispatch::DispatchOptions;
use crate::lexer::LexerOptions;
use crate::preprocessor::MacroSubstitution;
use crate::preprocessor::PreprocessorContext;
use crate::transform::AnnotationRule;
use crate::transform::RuleKind;
use crate::transform::TransformOptions;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["sipweave.toml", ".sipweave.toml"];

/// Default directory for generated `.sip` files, relative to the root.
pub const DEFAULT_OUTPUT_DIR: &str = "sip";

/// Configuration loaded from a `sipweave.toml` file.
///
/// ```toml
/// [module]
/// name = "widgets"
/// output_dir = "sip"
/// include_prefix = "widgets/"
/// imports = ["QtCore/QtCoremod.sip"]
///
/// [exclude]
/// patterns = ["**/private/**", "*_p.h"]
///
/// [preprocessor]
/// values = { WIDGETS_VERSION = 3, WIDGETS_DEPRECATED = false }
/// macros = [{ pattern = "WIDGETS_DEPRECATED_X\\([^)]*\\)", replacement = "" }]
///
/// [parser]
/// bare_macros = ["Q_OBJECT", "WIDGETS_EXPORT"]
/// macro_calls = ["Q_PROPERTY"]
///
/// [transform]
/// export_macros = ["WIDGETS_EXPORT"]
/// ignore_bases = ["QSharedData"]
///
/// [[transform.annotation_rules]]
/// kind = "constructor"
/// parameter_type = ".*\\*"
/// parameter_name = "parent"
/// annotations = ["TransferThis"]
///
/// [dispatch]
/// exclude = ["QObject"]
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct SipweaveConfig {
	#[serde(default)]
	pub module: ModuleConfig,
	#[serde(default)]
	pub exclude: ExcludeConfig,
	#[serde(default)]
	pub preprocessor: PreprocessorConfig,
	#[serde(default)]
	pub parser: ParserConfig,
	#[serde(default)]
	pub transform: TransformConfig,
	#[serde(default)]
	pub dispatch: DispatchConfig,
}

/// The SIP module the generated files belong to.
#[derive(Debug, Deserialize)]
pub struct ModuleConfig {
	/// Module name used for the `%Module` directive and the index file name.
	/// Defaults to the name of the project root directory.
	#[serde(default)]
	pub name: Option<String>,
	/// Where `.sip` files are written, relative to the project root.
	#[serde(default = "default_output_dir")]
	pub output_dir: PathBuf,
	/// Prepended to header file names in generated `#include` lines.
	#[serde(default)]
	pub include_prefix: String,
	/// Other SIP modules imported by the index file.
	#[serde(default)]
	pub imports: Vec<String>,
}

impl Default for ModuleConfig {
	fn default() -> Self {
		Self {
			name: None,
			output_dir: default_output_dir(),
			include_prefix: String::new(),
			imports: vec![],
		}
	}
}

fn default_output_dir() -> PathBuf {
	PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Headers removed from a run.
#[derive(Debug, Default, Deserialize)]
pub struct ExcludeConfig {
	/// Patterns in `.gitignore` syntax, relative to the project root.
	/// `private/` drops a whole directory, `*_p.h` drops matching files
	/// anywhere.
	#[serde(default)]
	pub patterns: Vec<String>,
}

/// A global value as written in TOML.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
#[non_exhaustive]
pub enum ConfigValue {
	Bool(bool),
	Int(i64),
	Text(String),
}

impl ConfigValue {
	/// The value as the preprocessor sees it. Booleans become `1` and `0`.
	pub fn to_value_string(&self) -> String {
		match self {
			Self::Bool(true) => "1".to_string(),
			Self::Bool(false) => "0".to_string(),
			Self::Int(value) => value.to_string(),
			Self::Text(text) => text.clone(),
		}
	}
}

/// A global regex substitution applied to every active header line.
#[derive(Debug, Clone, Deserialize)]
pub struct SubstitutionConfig {
	pub pattern: String,
	#[serde(default)]
	pub replacement: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreprocessorConfig {
	/// Values that win over any `#define` in the headers.
	#[serde(default)]
	pub values: BTreeMap<String, ConfigValue>,
	/// Applied in order after the substitutions the headers define.
	#[serde(default)]
	pub macros: Vec<SubstitutionConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ParserConfig {
	/// Macros used without arguments.
	#[serde(default = "default_bare_macros")]
	pub bare_macros: Vec<String>,
	/// Macros followed by an argument list.
	#[serde(default = "default_macro_calls")]
	pub macro_calls: Vec<String>,
}

impl Default for ParserConfig {
	fn default() -> Self {
		Self {
			bare_macros: default_bare_macros(),
			macro_calls: default_macro_calls(),
		}
	}
}

fn default_bare_macros() -> Vec<String> {
	[
		"Q_OBJECT",
		"Q_GADGET",
		"Q_INVOKABLE",
		"Q_DECL_OVERRIDE",
		"Q_DECL_FINAL",
		"Q_DECL_CONSTEXPR",
		"Q_DECL_DEPRECATED",
		"QT_BEGIN_NAMESPACE",
		"QT_END_NAMESPACE",
	]
	.into_iter()
	.map(String::from)
	.collect()
}

fn default_macro_calls() -> Vec<String> {
	[
		"Q_PROPERTY",
		"Q_ENUMS",
		"Q_FLAGS",
		"Q_ENUM",
		"Q_FLAG",
		"Q_DECLARE_FLAGS",
		"Q_DECLARE_OPERATORS_FOR_FLAGS",
		"Q_DISABLE_COPY",
	]
	.into_iter()
	.map(String::from)
	.collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnnotationRuleConfig {
	#[serde(default)]
	pub kind: RuleKind,
	#[serde(default = "match_everything")]
	pub parameter_type: String,
	#[serde(default = "match_everything")]
	pub parameter_name: String,
	pub annotations: Vec<String>,
}

fn match_everything() -> String {
	".*".to_string()
}

#[derive(Debug, Default, Deserialize)]
pub struct TransformConfig {
	/// When set, only top level classes carrying one of these macros are
	/// wrapped.
	#[serde(default)]
	pub export_macros: Vec<String>,
	#[serde(default)]
	pub ignore_bases: Vec<String>,
	/// Names that resolve nowhere but should not be warned about.
	#[serde(default)]
	pub known_types: Vec<String>,
	/// Applied in order to every function argument.
	#[serde(default)]
	pub annotation_rules: Vec<AnnotationRuleConfig>,
}

#[derive(Debug, Deserialize)]
pub struct DispatchConfig {
	#[serde(default = "enabled")]
	pub enabled: bool,
	/// Classes that get no type test of their own.
	#[serde(default)]
	pub exclude: Vec<String>,
}

impl Default for DispatchConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			exclude: vec![],
		}
	}
}

fn enabled() -> bool {
	true
}

impl SipweaveConfig {
	/// Resolve the first config file that exists in `root`.
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from `root`. Returns `None` when no config file
	/// exists.
	pub fn load(root: &Path) -> SipweaveResult<Option<SipweaveConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::from_toml(&content)?;

		Ok(Some(config))
	}

	pub fn from_toml(content: &str) -> SipweaveResult<SipweaveConfig> {
		toml::from_str(content).map_err(|e| SipweaveError::ConfigParse(e.to_string()))
	}

	/// The module name, falling back to the root directory name.
	pub fn module_name(&self, root: &Path) -> String {
		self.module.name.clone().unwrap_or_else(|| {
			root.canonicalize()
				.ok()
				.as_deref()
				.unwrap_or(root)
				.file_name()
				.map_or_else(|| "module".to_string(), |name| name.to_string_lossy().into_owned())
		})
	}

	/// A fresh preprocessor for one header.
	pub fn preprocessor(&self) -> SipweaveResult<PreprocessorContext> {
		let values: HashMap<String, String> = self
			.preprocessor
			.values
			.iter()
			.map(|(name, value)| (name.clone(), value.to_value_string()))
			.collect();
		let macros = self
			.preprocessor
			.macros
			.iter()
			.map(|rule| MacroSubstitution::global(&rule.pattern, &rule.replacement))
			.collect::<SipweaveResult<Vec<_>>>()?;

		Ok(PreprocessorContext::new(values, macros))
	}

	/// Export macros are bare macros too, whether or not they are listed.
	pub fn lexer_options(&self) -> LexerOptions {
		LexerOptions::new(
			self.parser
				.bare_macros
				.iter()
				.chain(&self.transform.export_macros)
				.cloned(),
			self.parser.macro_calls.iter().cloned(),
		)
	}

	pub fn transform_options(&self) -> SipweaveResult<TransformOptions> {
		let annotation_rules = self
			.transform
			.annotation_rules
			.iter()
			.map(|rule| {
				AnnotationRule::new(
					rule.kind,
					&rule.parameter_type,
					&rule.parameter_name,
					rule.annotations.iter().cloned(),
				)
			})
			.collect::<SipweaveResult<Vec<_>>>()?;

		Ok(TransformOptions {
			export_macros: self.transform.export_macros.clone(),
			ignore_bases: self.transform.ignore_bases.clone(),
			known_types: self.transform.known_types.iter().cloned().collect(),
			annotation_rules,
			include_prefix: self.module.include_prefix.clone(),
		})
	}

	pub fn dispatch_options(&self) -> DispatchOptions {
		DispatchOptions {
			enabled: self.dispatch.enabled,
			exclude: self.dispatch.exclude.iter().cloned().collect(),
			include_prefix: self.module.include_prefix.clone(),
		}
	}

	/// Compile the `[exclude]` patterns. They follow `.gitignore` syntax and
	/// are anchored at `root`.
	pub fn exclude_matcher(&self, root: &Path) -> SipweaveResult<Gitignore> {
		let mut builder = GitignoreBuilder::new(root);

		for pattern in &self.exclude.patterns {
			builder.add_line(None, pattern).map_err(|e| {
				SipweaveError::InvalidPattern {
					pattern: pattern.clone(),
					reason: e.to_string(),
				}
			})?;
		}

		builder.build().map_err(|e| {
			SipweaveError::InvalidPattern {
				pattern: self.exclude.patterns.join(", "),
				reason: e.to_string(),
			}
		})
	}
}
