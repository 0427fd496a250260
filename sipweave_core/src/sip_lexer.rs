//! Line oriented tokenizer for existing SIP files.
//!
//! Directives, code blocks, comments and the ignore and force markers are
//! recognized per line. Everything else goes through the same logos lexer as
//! headers, so declarations produce the tokens the declaration parser
//! already understands.

use std::path::Path;

use logos::Logos;

use crate::ParseError;
use crate::lexer::RawToken;
use crate::lexer::simple_token;
use crate::tokens::LexerMode;
use crate::tokens::Punct;
use crate::tokens::SpannedToken;
use crate::tokens::Token;

/// Names of `%Name ... %End` sections whose bodies are kept verbatim.
pub(crate) const CODE_BLOCK_NAMES: &[&str] = &[
	"AccessCode",
	"BIGetBufferCode",
	"BIReleaseBufferCode",
	"ConvertFromTypeCode",
	"ConvertToSubClassCode",
	"ConvertToTypeCode",
	"Copying",
	"Doc",
	"Docstring",
	"ExportedDoc",
	"ExportedHeaderCode",
	"ExportedTypeHintCode",
	"Extract",
	"FinalisationCode",
	"GCClearCode",
	"GCTraverseCode",
	"GetCode",
	"InitialisationCode",
	"InstanceCode",
	"MethodCode",
	"ModuleCode",
	"ModuleHeaderCode",
	"PickleCode",
	"PostInitialisationCode",
	"PreInitialisationCode",
	"RaiseCode",
	"SetCode",
	"TypeCode",
	"TypeHeaderCode",
	"TypeHintCode",
	"UnitCode",
	"UnitPostIncludeCode",
	"VirtualCallCode",
	"VirtualCatcherCode",
];

pub(crate) const IGNORE_MARKER: &str = "//ig";
pub(crate) const FORCE_BEGIN: &str = "//force";
pub(crate) const FORCE_END: &str = "//end";

/// The leading word of a directive or block header, e.g. `Docstring` for
/// `Docstring(format="raw")`.
pub(crate) fn directive_word(text: &str) -> &str {
	let end = text
		.find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
		.unwrap_or(text.len());
	&text[..end]
}

struct OpenBlock {
	name: String,
	body: String,
	line: usize,
	start: usize,
	ignored: bool,
}

/// A directive that may own a `{ ... };` body, such as `%MappedType` or
/// `%Exception`. The body is kept verbatim with the directive.
struct OpenDirective {
	text: String,
	line: usize,
	start: usize,
	end: usize,
	ignored: bool,
	/// Open braces once the body has started.
	depth: Option<usize>,
}

struct OpenComment {
	text: String,
	line: usize,
	start: usize,
	ignored: bool,
}

struct SipWalker<'a> {
	source: &'a str,
	file: Option<&'a Path>,
	stack: Vec<LexerMode>,
	block: Option<OpenBlock>,
	comment: Option<OpenComment>,
	directive: Option<OpenDirective>,
	/// Parentheses left open by earlier declaration lines.
	parens: usize,
	tokens: Vec<SpannedToken>,
}

impl<'a> SipWalker<'a> {
	fn new(source: &'a str, file: Option<&'a Path>) -> Self {
		Self {
			source,
			file,
			stack: vec![LexerMode::Declaration],
			block: None,
			comment: None,
			directive: None,
			parens: 0,
			tokens: vec![],
		}
	}

	fn mode(&self) -> LexerMode {
		self.stack.last().copied().unwrap_or(LexerMode::Declaration)
	}

	fn error(&self, line: usize, token: &str, message: impl Into<String>) -> ParseError {
		ParseError::new(
			self.file.map(Path::to_path_buf),
			line,
			self.mode(),
			token,
			message,
		)
	}

	fn emit(&mut self, token: Token, line: usize, start: usize, end: usize) {
		let mode = self.mode();
		self.tokens.push(SpannedToken::new(token, line, start..end, mode));
	}

	fn process(mut self) -> Result<Vec<SpannedToken>, ParseError> {
		let mut offset = 0;
		let mut line_number = 0;

		for segment in self.source.split_inclusive('\n') {
			line_number += 1;
			let line = segment.trim_end_matches('\n').trim_end_matches('\r');
			self.process_line(line, line_number, offset)?;
			offset += segment.len();
		}

		if let Some(block) = &self.block {
			return Err(self.error(block.line, &format!("%{}", block.name), "unterminated code block"));
		}

		if let Some(comment) = &self.comment {
			return Err(self.error(comment.line, "/*", "unterminated comment"));
		}

		if let Some(directive) = self.directive.take() {
			if directive.depth.is_some() {
				let word = directive.text.lines().next().unwrap_or_default().to_string();
				return Err(self.error(directive.line, &word, "unterminated directive body"));
			}
			self.emit_directive(directive);
		}

		Ok(self.tokens)
	}

	fn process_line(&mut self, line: &str, number: usize, offset: usize) -> Result<(), ParseError> {
		if self.block.is_some() {
			self.continue_block(line, offset);
			return Ok(());
		}

		if self.comment.is_some() {
			self.continue_comment(line, offset);
			return Ok(());
		}

		if self.continue_directive(line, offset) {
			return Ok(());
		}

		let trimmed = line.trim();
		let line_end = offset + line.len();
		let first_token = self.tokens.len();

		if trimmed == FORCE_BEGIN {
			self.emit(Token::ForceBegin, number, offset, line_end);
			return Ok(());
		}

		if trimmed == FORCE_END {
			self.emit(Token::ForceEnd, number, offset, line_end);
			return Ok(());
		}

		let (ignored, content) = match strip_ignore_marker(line) {
			Some(rest) => {
				self.emit(Token::IgnoreMarker, number, offset, offset + IGNORE_MARKER.len());
				(true, rest)
			}
			None => (false, line),
		};

		let content_offset = offset + (line.len() - content.len());
		let trimmed = content.trim();

		if trimmed.is_empty() {
			self.emit(Token::BlankLine, number, content_offset, line_end);
			return Ok(());
		}

		if trimmed.starts_with("//") {
			self.emit(Token::Comment(trimmed.to_string()), number, content_offset, line_end);
			return Ok(());
		}

		if trimmed.starts_with("/*") {
			if trimmed[2..].contains("*/") {
				self.emit(Token::Comment(trimmed.to_string()), number, content_offset, line_end);
			} else {
				self.stack.push(LexerMode::BlockComment);
				self.comment = Some(OpenComment {
					text: trimmed.to_string(),
					line: number,
					start: content_offset,
					ignored,
				});
			}
			return Ok(());
		}

		if let Some(directive) = trimmed.strip_prefix('%') {
			self.process_directive(directive, ignored, number, content_offset, line_end);
			return Ok(());
		}

		self.process_declaration_line(content, number, content_offset, first_token)
	}

	fn process_directive(
		&mut self,
		directive: &str,
		ignored: bool,
		number: usize,
		start: usize,
		end: usize,
	) {
		let word = directive_word(directive);

		match word {
			"If" => {
				let expression = match (directive.find('('), directive.rfind(')')) {
					(Some(open), Some(close)) if open < close => directive[open + 1..close].trim(),
					_ => directive[word.len()..].trim(),
				};
				self.emit(Token::IfBegin(expression.to_string()), number, start, end);
			}
			"End" => self.emit(Token::End, number, start, end),
			_ if CODE_BLOCK_NAMES.contains(&word) => {
				self.stack.push(LexerMode::CodeBlock);
				self.block = Some(OpenBlock {
					name: directive.trim().to_string(),
					body: String::new(),
					line: number,
					start,
					ignored,
				});
			}
			_ => {
				let text = format!("%{}", directive.trim());
				let depth = directive.contains('{').then(|| brace_depth(0, directive));
				let open = OpenDirective {
					text,
					line: number,
					start,
					end,
					ignored,
					depth,
				};

				if depth == Some(0) {
					self.emit_directive(open);
				} else {
					self.directive = Some(open);
				}
			}
		}
	}

	fn emit_directive(&mut self, directive: OpenDirective) {
		self.emit(
			Token::Directive(directive.text),
			directive.line,
			directive.start,
			directive.end,
		);
	}

	/// Feed a line to a pending directive. Returns `false` when the line is
	/// not part of its body and still has to be tokenized.
	fn continue_directive(&mut self, line: &str, offset: usize) -> bool {
		let Some(mut directive) = self.directive.take() else {
			return false;
		};

		let content = if directive.ignored {
			strip_ignore_marker(line).unwrap_or(line)
		} else {
			line
		};

		let depth = match directive.depth {
			Some(depth) => depth,
			None if content.trim_start().starts_with('{') => 0,
			None => {
				self.emit_directive(directive);
				return false;
			}
		};

		directive.text.push('\n');
		directive.text.push_str(content);
		directive.end = offset + line.len();

		let depth = brace_depth(depth, content);
		if depth == 0 {
			self.emit_directive(directive);
		} else {
			directive.depth = Some(depth);
			self.directive = Some(directive);
		}

		true
	}

	fn continue_block(&mut self, line: &str, offset: usize) {
		let Some(block) = self.block.as_mut() else {
			return;
		};

		let content = if block.ignored {
			strip_ignore_marker(line).unwrap_or(line)
		} else {
			line
		};

		if content.trim() == "%End" {
			if let Some(block) = self.block.take() {
				self.emit(
					Token::CodeBlock {
						name: block.name,
						body: block.body,
					},
					block.line,
					block.start,
					offset + line.len(),
				);
			}
			self.stack.pop();
			return;
		}

		block.body.push_str(content);
		block.body.push('\n');
	}

	fn continue_comment(&mut self, line: &str, offset: usize) {
		let Some(comment) = self.comment.as_mut() else {
			return;
		};

		let content = if comment.ignored {
			strip_ignore_marker(line).unwrap_or(line)
		} else {
			line
		};

		comment.text.push('\n');
		comment.text.push_str(content.trim_end());

		if content.contains("*/") {
			if let Some(comment) = self.comment.take() {
				self.emit(
					Token::Comment(comment.text),
					comment.line,
					comment.start,
					offset + line.len(),
				);
			}
			self.stack.pop();
		}
	}

	/// Tokenize a declaration line. A comment after code stays with the
	/// statement or enumerator it ends; on a line that ends mid-statement it
	/// is moved in front of the line so it survives as a comment of its own.
	fn process_declaration_line(
		&mut self,
		content: &str,
		number: usize,
		offset: usize,
		first_token: usize,
	) -> Result<(), ParseError> {
		let emitted = self.tokens.len();
		let mut comment: Option<(String, usize)> = None;

		for (result, range) in RawToken::lexer(content).spanned() {
			let slice = &content[range.clone()];
			let Ok(raw) = result else {
				return Err(self.error(number, slice, "unrecognized character"));
			};

			match raw {
				RawToken::LineComment => {
					comment = Some((slice.trim_end().to_string(), offset + range.start));
					break;
				}
				RawToken::BlockComment | RawToken::Whitespace | RawToken::Newline => {}
				RawToken::Directive => {
					return Err(self.error(number, slice, "unexpected preprocessor directive"));
				}
				_ => {
					if let Some(token) = simple_token(raw, slice) {
						match token {
							Token::Punct(Punct::LParen) => self.parens += 1,
							Token::Punct(Punct::RParen) => self.parens = self.parens.saturating_sub(1),
							_ => {}
						}
						self.emit(token, number, offset + range.start, offset + range.end);
					}
				}
			}
		}

		let Some((text, start)) = comment else {
			return Ok(());
		};
		let end = offset + content.len();

		let ends_statement = self.tokens.len() > emitted
			&& self.tokens.last().is_some_and(|last| {
				match last.token {
					Token::Punct(Punct::Semicolon | Punct::LBrace | Punct::RBrace) => true,
					Token::Punct(Punct::Comma) => self.parens == 0,
					_ => false,
				}
			});

		if ends_statement {
			self.emit(Token::TrailingComment(text), number, start, end);
		} else {
			let mode = self.mode();
			self.tokens.insert(
				first_token,
				SpannedToken::new(Token::Comment(text), number, start..end, mode),
			);
		}

		Ok(())
	}
}

fn brace_depth(depth: usize, text: &str) -> usize {
	text.chars().fold(depth, |depth, c| {
		match c {
			'{' => depth + 1,
			'}' => depth.saturating_sub(1),
			_ => depth,
		}
	})
}

/// The rest of a line starting with the ignore marker, without the single
/// space that separates the marker from the original text.
pub(crate) fn strip_ignore_marker(line: &str) -> Option<&str> {
	let rest = line.strip_prefix(IGNORE_MARKER)?;
	if rest.is_empty() {
		return Some(rest);
	}
	rest.strip_prefix(' ')
}

/// Tokenize the text of a SIP file.
pub fn tokenize_sip(text: &str, file: Option<&Path>) -> Result<Vec<SpannedToken>, ParseError> {
	SipWalker::new(text, file).process()
}
