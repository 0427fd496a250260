use std::fmt;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::tokens::LexerMode;

/// A fatal lexical or syntactic error in either dialect.
///
/// Carries everything needed to point at the problem: the file (when known),
/// the 1-indexed line, the lexer mode active when the offending token was
/// produced, and the offending token text itself.
#[derive(Debug, Clone, PartialEq, Eq, Diagnostic, Error)]
#[error("{location}: {message} (mode: {mode}, near `{token}`)")]
#[diagnostic(
	code(sipweave::parse),
	help("fix the declaration or add the offending macro to `bare_macros` / `macro_calls`")
)]
pub struct ParseError {
	pub file: Option<PathBuf>,
	pub line: usize,
	pub mode: LexerMode,
	pub token: String,
	pub message: String,
	location: ErrorLocation,
}

impl ParseError {
	pub fn new(
		file: Option<PathBuf>,
		line: usize,
		mode: LexerMode,
		token: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		let location = ErrorLocation {
			file: file.clone(),
			line,
		};

		Self {
			file,
			line,
			mode,
			token: token.into(),
			message: message.into(),
			location,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ErrorLocation {
	file: Option<PathBuf>,
	line: usize,
}

impl fmt::Display for ErrorLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.file {
			Some(file) => write!(f, "{}:{}", file.display(), self.line),
			None => write!(f, "<input>:{}", self.line),
		}
	}
}

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum SipweaveError {
	#[error(transparent)]
	#[diagnostic(code(sipweave::io_error))]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	#[diagnostic(transparent)]
	Parse(#[from] ParseError),

	#[error("invalid preprocessor expression `{expression}`: {reason}")]
	#[diagnostic(code(sipweave::expression))]
	Expression { expression: String, reason: String },

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(sipweave::config_parse),
		help("check that sipweave.toml is valid TOML with [module], [parser] and [transform] sections")
	)]
	ConfigParse(String),

	#[error("invalid pattern `{pattern}`: {reason}")]
	#[diagnostic(
		code(sipweave::invalid_pattern),
		help("macro substitutions and annotation rules use regular expressions, excludes use globs")
	)]
	InvalidPattern { pattern: String, reason: String },

	#[error("failed to read header `{path}`: {reason}")]
	#[diagnostic(code(sipweave::header_read))]
	HeaderRead { path: String, reason: String },

	#[error("no header files to process")]
	#[diagnostic(
		code(sipweave::no_headers),
		help("pass header paths on the command line or check the [exclude] patterns")
	)]
	NoHeaders,
}

pub type SipweaveResult<T> = Result<T, SipweaveError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
