use std::path::PathBuf;

use crate::ParseError;
use crate::tokens::Keyword;
use crate::tokens::LexerMode;
use crate::tokens::Punct;
use crate::tokens::SpannedToken;
use crate::tokens::Token;

/// Spellings of builtin types. An identifier from this list is never the
/// name of a declarator and never needs qualification.
pub(crate) const BUILTIN_TYPES: &[&str] = &[
	"void", "bool", "char", "short", "int", "long", "float", "double", "signed", "unsigned",
	"wchar_t", "char8_t", "char16_t", "char32_t", "size_t", "ssize_t", "ptrdiff_t", "intptr_t",
	"uintptr_t", "int8_t", "int16_t", "int32_t", "int64_t", "uint8_t", "uint16_t", "uint32_t",
	"uint64_t", "auto", "decltype", "nullptr_t",
];

pub(crate) fn is_builtin(name: &str) -> bool {
	BUILTIN_TYPES.contains(&name)
}

/// A position in a token stream with the helpers both declaration parsers
/// need.
pub(crate) struct TokenCursor<'a> {
	source: &'a str,
	tokens: &'a [SpannedToken],
	index: usize,
	file: Option<PathBuf>,
}

impl<'a> TokenCursor<'a> {
	pub(crate) fn new(source: &'a str, tokens: &'a [SpannedToken], file: Option<PathBuf>) -> Self {
		Self {
			source,
			tokens,
			index: 0,
			file,
		}
	}

	pub(crate) fn position(&self) -> usize {
		self.index
	}

	pub(crate) fn reset(&mut self, position: usize) {
		self.index = position;
	}

	/// The token at the cursor without skipping trivia.
	pub(crate) fn peek_raw(&self) -> Option<&'a Token> {
		self.tokens.get(self.index).map(|spanned| &spanned.token)
	}

	pub(crate) fn advance(&mut self) {
		if self.index < self.tokens.len() {
			self.index += 1;
		}
	}

	pub(crate) fn skip_trivia(&mut self) {
		while self.peek_raw().is_some_and(Token::is_trivia) {
			self.index += 1;
		}
	}

	/// The next token that is not trivia.
	pub(crate) fn peek(&mut self) -> Option<&'a Token> {
		self.skip_trivia();
		self.peek_raw()
	}

	/// The `n`th token after the next one, skipping trivia.
	pub(crate) fn peek_nth(&mut self, n: usize) -> Option<&'a Token> {
		self.skip_trivia();
		self.tokens[self.index..]
			.iter()
			.filter(|spanned| !spanned.token.is_trivia())
			.nth(n)
			.map(|spanned| &spanned.token)
	}

	pub(crate) fn next(&mut self) -> Option<&'a SpannedToken> {
		self.skip_trivia();
		let token = self.tokens.get(self.index);
		self.advance();
		token
	}

	pub(crate) fn is_at_end(&mut self) -> bool {
		self.peek().is_none()
	}

	pub(crate) fn is_punct(&mut self, punct: Punct) -> bool {
		self.peek().is_some_and(|token| token.is_punct(punct))
	}

	pub(crate) fn is_keyword(&mut self, keyword: Keyword) -> bool {
		self.peek().is_some_and(|token| token.is_keyword(keyword))
	}

	pub(crate) fn eat_punct(&mut self, punct: Punct) -> bool {
		if self.is_punct(punct) {
			self.advance();
			return true;
		}
		false
	}

	pub(crate) fn eat_keyword(&mut self, keyword: Keyword) -> bool {
		if self.is_keyword(keyword) {
			self.advance();
			return true;
		}
		false
	}

	pub(crate) fn expect_punct(&mut self, punct: Punct) -> Result<(), ParseError> {
		if self.eat_punct(punct) {
			return Ok(());
		}
		Err(self.error(format!("expected `{punct}`")))
	}

	pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
		match self.peek() {
			Some(Token::Identifier(name)) => {
				let name = name.clone();
				self.advance();
				Ok(name)
			}
			_ => Err(self.error("expected an identifier")),
		}
	}

	/// Build an error pointing at the current token.
	pub(crate) fn error(&mut self, message: impl Into<String>) -> ParseError {
		self.skip_trivia();
		match self.tokens.get(self.index) {
			Some(spanned) => {
				ParseError::new(
					self.file.clone(),
					spanned.line,
					spanned.mode,
					spanned.token.to_string(),
					message,
				)
			}
			None => {
				let line = self.tokens.last().map_or(1, |spanned| spanned.line);
				ParseError::new(
					self.file.clone(),
					line,
					LexerMode::Declaration,
					"<end of input>",
					message,
				)
			}
		}
	}

	/// The line of the next significant token.
	pub(crate) fn line(&mut self) -> usize {
		self.skip_trivia();
		self.tokens
			.get(self.index)
			.or_else(|| self.tokens.last())
			.map_or(1, |spanned| spanned.line)
	}

	pub(crate) fn file(&self) -> Option<PathBuf> {
		self.file.clone()
	}

	/// The source text spanned by the significant tokens between two token
	/// positions, with whitespace collapsed.
	pub(crate) fn text_between(&self, start: usize, end: usize) -> String {
		let significant: Vec<&SpannedToken> = self.tokens[start..end]
			.iter()
			.filter(|spanned| !spanned.token.is_trivia())
			.collect();

		match (significant.first(), significant.last()) {
			(Some(first), Some(last)) => {
				collapse_whitespace(&self.source[first.span.start..last.span.end])
			}
			_ => String::new(),
		}
	}

	/// Significant tokens between two positions.
	pub(crate) fn tokens_between(&self, start: usize, end: usize) -> Vec<&'a Token> {
		self.tokens[start..end]
			.iter()
			.map(|spanned| &spanned.token)
			.filter(|token| !token.is_trivia())
			.collect()
	}
}

/// Collapse runs of whitespace, including line breaks, to single spaces.
pub(crate) fn collapse_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Spell a sequence of type tokens the canonical way, e.g.
/// `const QString &`, `QMap<QString, int>`, `void (*)(int)`.
pub(crate) fn format_type(tokens: &[&Token]) -> String {
	let mut output = String::new();
	let mut previous: Option<&Token> = None;

	for &token in tokens {
		if previous.is_some_and(|previous| needs_space(previous, token)) {
			output.push(' ');
		}
		output.push_str(&token.to_string());
		previous = Some(token);
	}

	output
}

fn needs_space(previous: &Token, next: &Token) -> bool {
	use Punct::*;

	match (previous, next) {
		(Token::Punct(ColonColon | LAngle | LParen | LBracket | Tilde), _) => false,
		(_, Token::Punct(ColonColon | RAngle | RParen | LBracket | RBracket | Comma | LAngle)) => {
			false
		}
		(Token::Punct(Star | Ampersand), Token::Punct(Star | Ampersand | LParen)) => false,
		(Token::Operator(op), _) if op == "&&" => false,
		(Token::Punct(RParen), Token::Punct(LParen)) => false,
		(_, Token::Punct(Star | Ampersand)) => true,
		(_, Token::Operator(op)) if op == "&&" => true,
		(Token::Punct(Star | Ampersand), _) => false,
		_ => true,
	}
}

/// Whether a declarator name attaches directly to the type, as in
/// `const QString &name`.
pub(crate) fn is_reference_or_pointer(type_name: &str) -> bool {
	type_name.ends_with('*') || type_name.ends_with('&')
}
