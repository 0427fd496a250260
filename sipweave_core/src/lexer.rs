use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;

use logos::Logos;

use crate::ParseError;
use crate::tokens::Keyword;
use crate::tokens::KeywordClass;
use crate::tokens::LexerMode;
use crate::tokens::Punct;
use crate::tokens::SpannedToken;
use crate::tokens::Token;

/// Raw tokens produced by logos. Shared by both tokenizers; everything
/// context dependent happens in the walkers.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RawToken {
	#[regex(r"//[^\n]*", allow_greedy = true)]
	LineComment,
	#[regex(r"/\*([^*]|\*+[^*/])*\*+/")]
	BlockComment,
	#[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
	Identifier,
	#[regex(r"[0-9][0-9A-Za-z_.]*")]
	#[regex(r"\.[0-9][0-9A-Za-z_]*")]
	Number,
	#[regex(r#""([^"\\\n]|\\.)*""#)]
	StringLiteral,
	#[regex(r"'([^'\\\n]|\\.)*'")]
	CharLiteral,
	#[token("::")]
	ColonColon,
	#[token(":")]
	Colon,
	#[token(";")]
	Semicolon,
	#[token(",")]
	Comma,
	#[token("(")]
	LParen,
	#[token(")")]
	RParen,
	#[token("{")]
	LBrace,
	#[token("}")]
	RBrace,
	#[token("[")]
	LBracket,
	#[token("]")]
	RBracket,
	#[token("<")]
	LAngle,
	#[token(">")]
	RAngle,
	#[token("=")]
	Assign,
	#[token("*")]
	Star,
	#[token("&")]
	Ampersand,
	#[token("~")]
	Tilde,
	#[token("...")]
	Ellipsis,
	#[token(".")]
	Dot,
	#[token("/")]
	Slash,
	#[regex(r"->\*?|\+\+|--|==|!=|<=|>=|&&|\|\||[-+*/%&|^]=|\.\*")]
	CompoundOperator,
	#[regex(r"[-+!%^|?]")]
	Operator,
	#[token("\n")]
	Newline,
	#[regex(r"[ \t\r\f\x0b]+")]
	#[token("\\")]
	Whitespace,
	#[regex(r"#[^\n]*", allow_greedy = true)]
	Directive,
}

/// Map the context free raw tokens onto shared tokens. Comments, whitespace
/// and directives return `None`.
pub(crate) fn simple_token(raw: RawToken, slice: &str) -> Option<Token> {
	let punct = match raw {
		RawToken::Identifier => {
			return Some(match Keyword::lookup(slice) {
				Some(keyword) => Token::Keyword(keyword),
				None => Token::Identifier(slice.to_string()),
			});
		}
		RawToken::Number => return Some(Token::Number(slice.to_string())),
		RawToken::StringLiteral => return Some(Token::StringLiteral(slice.to_string())),
		RawToken::CharLiteral => return Some(Token::CharLiteral(slice.to_string())),
		RawToken::CompoundOperator | RawToken::Operator => {
			return Some(Token::Operator(slice.to_string()));
		}
		RawToken::LineComment
		| RawToken::BlockComment
		| RawToken::Newline
		| RawToken::Whitespace
		| RawToken::Directive => return None,
		RawToken::ColonColon => Punct::ColonColon,
		RawToken::Colon => Punct::Colon,
		RawToken::Semicolon => Punct::Semicolon,
		RawToken::Comma => Punct::Comma,
		RawToken::LParen => Punct::LParen,
		RawToken::RParen => Punct::RParen,
		RawToken::LBrace => Punct::LBrace,
		RawToken::RBrace => Punct::RBrace,
		RawToken::LBracket => Punct::LBracket,
		RawToken::RBracket => Punct::RBracket,
		RawToken::LAngle => Punct::LAngle,
		RawToken::RAngle => Punct::RAngle,
		RawToken::Assign => Punct::Assign,
		RawToken::Star => Punct::Star,
		RawToken::Ampersand => Punct::Ampersand,
		RawToken::Tilde => Punct::Tilde,
		RawToken::Ellipsis => Punct::Ellipsis,
		RawToken::Dot => Punct::Dot,
		RawToken::Slash => Punct::Slash,
	};

	Some(Token::Punct(punct))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentKind {
	Plain,
	Doc,
	Trailing,
}

fn classify_comment(text: &str) -> CommentKind {
	if ["///<", "//!<", "/**<", "/*!<"]
		.iter()
		.any(|prefix| text.starts_with(prefix))
	{
		return CommentKind::Trailing;
	}

	let line_doc = (text.starts_with("///") && !text.starts_with("////")) || text.starts_with("//!");
	let block_doc = (text.starts_with("/**") && !text.starts_with("/***") && text != "/**/")
		|| text.starts_with("/*!");

	if line_doc || block_doc {
		CommentKind::Doc
	} else {
		CommentKind::Plain
	}
}

/// Split the text between a pair of parentheses at top level commas.
pub(crate) fn split_arguments(text: &str) -> Vec<String> {
	let mut arguments = vec![];
	let mut depth = 0usize;
	let mut quote: Option<char> = None;
	let mut escaped = false;
	let mut current = String::new();

	for c in text.chars() {
		if let Some(open) = quote {
			current.push(c);
			if escaped {
				escaped = false;
			} else if c == '\\' {
				escaped = true;
			} else if c == open {
				quote = None;
			}
			continue;
		}

		match c {
			'"' | '\'' => quote = Some(c),
			'(' | '<' | '[' | '{' => depth += 1,
			')' | '>' | ']' | '}' => depth = depth.saturating_sub(1),
			',' if depth == 0 => {
				arguments.push(current.trim().to_string());
				current.clear();
				continue;
			}
			_ => {}
		}

		current.push(c);
	}

	let last = current.trim();
	if !last.is_empty() || !arguments.is_empty() {
		arguments.push(last.to_string());
	}

	arguments
}

/// Macro names the tokenizer turns into [`Token::Macro`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LexerOptions {
	/// Macros used without arguments, e.g. `Q_OBJECT`, export macros.
	pub bare_macros: HashSet<String>,
	/// Macros followed by an argument list, e.g. `Q_PROPERTY(...)`.
	pub macro_calls: HashSet<String>,
}

impl LexerOptions {
	pub fn new<B, C>(bare_macros: B, macro_calls: C) -> Self
	where
		B: IntoIterator,
		B::Item: Into<String>,
		C: IntoIterator,
		C::Item: Into<String>,
	{
		Self {
			bare_macros: bare_macros.into_iter().map(Into::into).collect(),
			macro_calls: macro_calls.into_iter().map(Into::into).collect(),
		}
	}
}

/// What the current statement has seen so far. Decides what an opening brace
/// means.
#[derive(Debug, Default)]
struct Statement {
	/// `class`, `struct`, `union`, `namespace` or `extern "C"`.
	structural: bool,
	enum_head: bool,
	extern_pending: bool,
	paren_depth: usize,
	/// A top level parenthesis list was closed.
	paren_closed: bool,
	assigned: bool,
	last: Option<Token>,
}

/// Walks the logos token stream with a mode stack, producing the header
/// token stream.
struct SourceWalker<'a> {
	source: &'a str,
	file: Option<&'a Path>,
	options: &'a LexerOptions,
	raw_tokens: Vec<(Result<RawToken, ()>, Range<usize>)>,
	cursor: usize,
	line: usize,
	stack: Vec<LexerMode>,
	statement: Statement,
	tokens: Vec<SpannedToken>,
}

impl<'a> SourceWalker<'a> {
	fn new(source: &'a str, file: Option<&'a Path>, options: &'a LexerOptions) -> Self {
		Self {
			source,
			file,
			options,
			raw_tokens: RawToken::lexer(source).spanned().collect(),
			cursor: 0,
			line: 1,
			stack: vec![LexerMode::Declaration],
			statement: Statement::default(),
			tokens: vec![],
		}
	}

	fn mode(&self) -> LexerMode {
		self.stack.last().copied().unwrap_or(LexerMode::Declaration)
	}

	fn slice(&self, index: usize) -> &'a str {
		let (_, span) = &self.raw_tokens[index];
		&self.source[span.clone()]
	}

	fn error(&self, token: &str, message: impl Into<String>) -> ParseError {
		ParseError::new(
			self.file.map(Path::to_path_buf),
			self.line,
			self.mode(),
			token,
			message,
		)
	}

	/// Move past the current raw token, counting the lines it spans.
	fn advance(&mut self) {
		let slice = self.slice(self.cursor);
		self.line += slice.matches('\n').count();
		self.cursor += 1;
	}

	fn emit(&mut self, token: Token, span: Range<usize>, line: usize) {
		let mode = self.mode();
		self.tokens.push(SpannedToken::new(token, line, span, mode));
	}

	/// Emit a token for the current raw token and advance past it.
	fn push(&mut self, token: Token) {
		let (_, span) = self.raw_tokens[self.cursor].clone();
		if !matches!(
			token,
			Token::DocComment(_) | Token::TrailingDocComment(_)
		) {
			self.statement.last = Some(token.clone());
		}
		self.emit(token, span, self.line);
		self.advance();
	}

	fn reset_statement(&mut self) {
		self.statement = Statement::default();
	}

	fn process(mut self) -> Result<Vec<SpannedToken>, ParseError> {
		while self.cursor < self.raw_tokens.len() {
			let (result, _) = &self.raw_tokens[self.cursor];
			let slice = self.slice(self.cursor);

			let Ok(raw) = *result else {
				return Err(self.error(slice, "unrecognized character"));
			};

			match raw {
				RawToken::Newline | RawToken::Whitespace | RawToken::Directive => self.advance(),
				RawToken::LineComment | RawToken::BlockComment => self.process_comment(slice),
				RawToken::LBrace => self.process_open_brace()?,
				RawToken::RBrace => {
					if self.mode() == LexerMode::EnumBody {
						self.stack.pop();
					}
					self.push(Token::Punct(Punct::RBrace));
					self.reset_statement();
				}
				RawToken::Semicolon => {
					self.push(Token::Punct(Punct::Semicolon));
					self.reset_statement();
				}
				RawToken::Colon => self.process_colon()?,
				RawToken::LParen => {
					self.statement.paren_depth += 1;
					self.push(Token::Punct(Punct::LParen));
				}
				RawToken::RParen => {
					self.statement.paren_depth = self.statement.paren_depth.saturating_sub(1);
					if self.statement.paren_depth == 0 {
						self.statement.paren_closed = true;
					}
					self.push(Token::Punct(Punct::RParen));
				}
				RawToken::Assign => {
					if self.statement.paren_depth == 0 {
						self.statement.assigned = true;
					}
					self.push(Token::Punct(Punct::Assign));
				}
				RawToken::Identifier => self.process_identifier(slice)?,
				RawToken::StringLiteral => {
					if self.statement.extern_pending {
						self.statement.structural = true;
					}
					self.push(Token::StringLiteral(slice.to_string()));
				}
				_ => {
					if let Some(token) = simple_token(raw, slice) {
						self.push(token);
					} else {
						self.advance();
					}
				}
			}
		}

		if let Some(mode @ (LexerMode::EnumBody | LexerMode::MacroCall | LexerMode::FunctionBody)) =
			self.stack.last().copied()
		{
			return Err(ParseError::new(
				self.file.map(Path::to_path_buf),
				self.line,
				mode,
				"<end of input>",
				"unterminated block",
			));
		}

		Ok(self.tokens)
	}

	fn process_comment(&mut self, slice: &str) {
		match classify_comment(slice) {
			CommentKind::Doc => self.push(Token::DocComment(slice.to_string())),
			CommentKind::Trailing if self.mode() == LexerMode::EnumBody => {
				self.push(Token::TrailingDocComment(slice.to_string()));
			}
			CommentKind::Trailing | CommentKind::Plain => self.advance(),
		}
	}

	fn process_identifier(&mut self, slice: &str) -> Result<(), ParseError> {
		if let Some(keyword) = Keyword::lookup(slice) {
			match keyword {
				Keyword::Class | Keyword::Struct | Keyword::Union | Keyword::Namespace => {
					self.statement.structural = true;
				}
				Keyword::Enum => self.statement.enum_head = true,
				Keyword::Extern => self.statement.extern_pending = true,
				_ => {}
			}
			self.push(Token::Keyword(keyword));
			return Ok(());
		}

		if self.options.macro_calls.contains(slice) {
			self.push(Token::Macro(slice.to_string()));
			return self.process_macro_arguments();
		}

		if self.options.bare_macros.contains(slice) {
			self.push(Token::Macro(slice.to_string()));
			return Ok(());
		}

		self.push(Token::Identifier(slice.to_string()));
		Ok(())
	}

	/// The statement decides whether `{` opens a scope, an enum body or an
	/// opaque block.
	fn process_open_brace(&mut self) -> Result<(), ParseError> {
		let statement = &self.statement;

		if statement.paren_depth > 0 {
			self.push(Token::Punct(Punct::LBrace));
			return Ok(());
		}

		if statement.paren_closed {
			self.consume_block(false)?;
			self.reset_statement();
			return Ok(());
		}

		if statement.enum_head {
			self.push(Token::Punct(Punct::LBrace));
			self.stack.push(LexerMode::EnumBody);
			self.reset_statement();
			return Ok(());
		}

		if statement.structural {
			self.push(Token::Punct(Punct::LBrace));
			self.reset_statement();
			return Ok(());
		}

		let brace_initializer = statement.assigned
			|| matches!(
				statement.last,
				Some(Token::Identifier(_) | Token::Punct(Punct::RAngle))
			);

		if brace_initializer {
			self.consume_block(false)?;
		} else {
			self.push(Token::Punct(Punct::LBrace));
		}

		Ok(())
	}

	fn process_colon(&mut self) -> Result<(), ParseError> {
		let statement = &self.statement;

		let after_access = matches!(
			statement.last,
			Some(Token::Keyword(keyword)) if keyword.class() == KeywordClass::AccessSpecifier
		);

		if after_access {
			self.push(Token::Punct(Punct::Colon));
			self.reset_statement();
			return Ok(());
		}

		// `Foo(int a) : a_(a) {}` and `Foo() noexcept : ...`
		let closes_declarator = matches!(statement.last, Some(Token::Punct(Punct::RParen)))
			|| matches!(&statement.last, Some(Token::Identifier(word)) if word == "noexcept");

		if closes_declarator && statement.paren_closed && statement.paren_depth == 0 && !statement.structural {
			self.consume_block(true)?;
			self.reset_statement();
			return Ok(());
		}

		self.push(Token::Punct(Punct::Colon));
		Ok(())
	}

	/// Consume a balanced brace region starting at the current raw token and
	/// emit it as a single [`Token::Block`]. With `initializer_list` the
	/// region starts at the `:` of a constructor initializer list.
	fn consume_block(&mut self, initializer_list: bool) -> Result<(), ParseError> {
		self.stack.push(LexerMode::FunctionBody);

		let start_line = self.line;
		let start = self.raw_tokens[self.cursor].1.start;
		let mut in_initializers = initializer_list;
		let mut depth = 0usize;
		let mut parens = 0usize;
		let mut previous: Option<RawToken> = None;

		if initializer_list {
			self.advance();
		}

		loop {
			if self.cursor >= self.raw_tokens.len() {
				return Err(self.error("<end of input>", "unterminated function body"));
			}

			let raw = self.raw_tokens[self.cursor].0.ok();
			let end = self.raw_tokens[self.cursor].1.end;
			self.advance();

			match raw {
				Some(RawToken::LParen) => parens += 1,
				Some(RawToken::RParen) => parens = parens.saturating_sub(1),
				Some(RawToken::LBrace) => {
					let brace_initializer = in_initializers
						&& depth == 0 && parens == 0
						&& matches!(previous, Some(RawToken::Identifier | RawToken::RAngle));
					if in_initializers && !brace_initializer && depth == 0 && parens == 0 {
						in_initializers = false;
					}
					depth += 1;
				}
				Some(RawToken::RBrace) => {
					depth = depth.saturating_sub(1);
					if depth == 0 && !in_initializers {
						let body = self.source[start..end].to_string();
						self.emit(Token::Block(body), start..end, start_line);
						self.stack.pop();
						self.statement.last = None;
						return Ok(());
					}
				}
				_ => {}
			}

			if let Some(
				token @ (RawToken::Identifier
				| RawToken::RAngle
				| RawToken::RParen
				| RawToken::RBrace
				| RawToken::Comma),
			) = raw
			{
				previous = Some(token);
			}
		}
	}

	/// After a configured call macro, capture a balanced argument list as a
	/// single [`Token::MacroArguments`].
	fn process_macro_arguments(&mut self) -> Result<(), ParseError> {
		let mut lookahead = self.cursor;
		while lookahead < self.raw_tokens.len()
			&& matches!(
				self.raw_tokens[lookahead].0,
				Ok(RawToken::Whitespace | RawToken::Newline)
			) {
			lookahead += 1;
		}

		if !matches!(
			self.raw_tokens.get(lookahead),
			Some((Ok(RawToken::LParen), _))
		) {
			return Ok(());
		}

		while self.cursor < lookahead {
			self.advance();
		}

		self.stack.push(LexerMode::MacroCall);
		let start_line = self.line;
		let start = self.raw_tokens[self.cursor].1.start;
		let mut depth = 0usize;

		loop {
			if self.cursor >= self.raw_tokens.len() {
				return Err(self.error("<end of input>", "unterminated macro argument list"));
			}

			let raw = self.raw_tokens[self.cursor].0.ok();
			let end = self.raw_tokens[self.cursor].1.end;
			self.advance();

			match raw {
				Some(RawToken::LParen) => depth += 1,
				Some(RawToken::RParen) => {
					depth = depth.saturating_sub(1);
					if depth == 0 {
						let arguments = split_arguments(&self.source[start + 1..end - 1]);
						self.emit(Token::MacroArguments(arguments), start..end, start_line);
						self.stack.pop();
						return Ok(());
					}
				}
				_ => {}
			}
		}
	}
}

/// Tokenize preprocessed header text.
///
/// Function bodies and initializer lists become single [`Token::Block`]
/// tokens, configured call macros capture their argument list, plain
/// comments are dropped and doc comments are kept.
pub fn tokenize_source(
	text: &str,
	file: Option<&Path>,
	options: &LexerOptions,
) -> Result<Vec<SpannedToken>, ParseError> {
	SourceWalker::new(text, file, options).process()
}
