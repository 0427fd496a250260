use std::fmt;
use std::fmt::Display;
use std::ops::Range;

/// Tokens shared by the header tokenizer and the `.sip` tokenizer.
///
/// Both dialects produce the same token type so a single declaration parser
/// can consume either stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
	/// An identifier that is not a keyword, e.g. `QString`, `int`.
	Identifier(String),
	Keyword(Keyword),
	/// A numeric literal, kept as written.
	Number(String),
	/// A string literal including its quotes.
	StringLiteral(String),
	/// A character literal including its quotes.
	CharLiteral(String),
	Punct(Punct),
	/// Any other operator, e.g. `->`, `==`, `+`.
	Operator(String),
	/// `/** ... */` or `/// ...` preceding a declaration.
	DocComment(String),
	/// `///< ...`, `//!< ...` or `/**< ... */` following an enumerator.
	TrailingDocComment(String),
	/// A comment kept for round-tripping. Only produced by the `.sip`
	/// tokenizer.
	Comment(String),
	/// A comment following code on the same line, e.g. `void f(); // note`.
	/// Only produced by the `.sip` tokenizer.
	TrailingComment(String),
	BlankLine,
	/// An opaque balanced-brace region such as a function body.
	Block(String),
	/// A configured macro name.
	Macro(String),
	/// The argument list following a configured call macro.
	MacroArguments(Vec<String>),
	/// `%Name ... %End`.
	CodeBlock { name: String, body: String },
	/// A `%Directive` line, with its brace body when it owns one.
	Directive(String),
	/// `%If (EXPR)`, holding `EXPR`.
	IfBegin(String),
	/// `%End` closing a `%If`.
	End,
	/// `//ig`
	IgnoreMarker,
	/// `//force`
	ForceBegin,
	/// `//end`
	ForceEnd,
}

impl Token {
	pub fn is_punct(&self, punct: Punct) -> bool {
		matches!(self, Token::Punct(other) if *other == punct)
	}

	pub fn is_keyword(&self, keyword: Keyword) -> bool {
		matches!(self, Token::Keyword(other) if *other == keyword)
	}

	/// Tokens that carry no declaration content and may appear between the
	/// lines of a multi-line declaration.
	pub fn is_trivia(&self) -> bool {
		matches!(
			self,
			Token::Comment(_)
				| Token::TrailingComment(_)
				| Token::BlankLine
				| Token::IgnoreMarker
				| Token::DocComment(_)
				| Token::TrailingDocComment(_)
		)
	}

	/// Tokens that can be part of a spelled type or name.
	pub fn is_word(&self) -> bool {
		matches!(
			self,
			Token::Identifier(_) | Token::Keyword(_) | Token::Number(_)
		)
	}
}

impl Display for Token {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Token::Identifier(text)
			| Token::Number(text)
			| Token::StringLiteral(text)
			| Token::CharLiteral(text)
			| Token::Operator(text)
			| Token::DocComment(text)
			| Token::TrailingDocComment(text)
			| Token::Comment(text)
			| Token::TrailingComment(text)
			| Token::Macro(text)
			| Token::Directive(text) => write!(f, "{text}"),
			Token::Keyword(keyword) => write!(f, "{keyword}"),
			Token::Punct(punct) => write!(f, "{punct}"),
			Token::BlankLine => write!(f, "<blank line>"),
			Token::Block(_) => write!(f, "{{...}}"),
			Token::MacroArguments(arguments) => write!(f, "({})", arguments.join(", ")),
			Token::CodeBlock { name, .. } => write!(f, "%{name}"),
			Token::IfBegin(expression) => write!(f, "%If ({expression})"),
			Token::End => write!(f, "%End"),
			Token::IgnoreMarker => write!(f, "//ig"),
			Token::ForceBegin => write!(f, "//force"),
			Token::ForceEnd => write!(f, "//end"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
	ColonColon,
	Colon,
	Semicolon,
	Comma,
	LParen,
	RParen,
	LBrace,
	RBrace,
	LBracket,
	RBracket,
	LAngle,
	RAngle,
	Assign,
	Star,
	Ampersand,
	Tilde,
	Ellipsis,
	Dot,
	Slash,
}

impl Punct {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::ColonColon => "::",
			Self::Colon => ":",
			Self::Semicolon => ";",
			Self::Comma => ",",
			Self::LParen => "(",
			Self::RParen => ")",
			Self::LBrace => "{",
			Self::RBrace => "}",
			Self::LBracket => "[",
			Self::RBracket => "]",
			Self::LAngle => "<",
			Self::RAngle => ">",
			Self::Assign => "=",
			Self::Star => "*",
			Self::Ampersand => "&",
			Self::Tilde => "~",
			Self::Ellipsis => "...",
			Self::Dot => ".",
			Self::Slash => "/",
		}
	}
}

impl Display for Punct {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// How a keyword participates in a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordClass {
	TypeQualifier,
	StorageClass,
	AccessSpecifier,
	Structural,
}

macro_rules! keywords {
	($($variant:ident => $text:literal, $class:ident;)*) => {
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
		pub enum Keyword {
			$($variant,)*
		}

		impl Keyword {
			/// Look up the keyword spelled by `text`.
			pub fn lookup(text: &str) -> Option<Self> {
				match text {
					$($text => Some(Self::$variant),)*
					_ => None,
				}
			}

			pub fn as_str(self) -> &'static str {
				match self {
					$(Self::$variant => $text,)*
				}
			}

			pub fn class(self) -> KeywordClass {
				match self {
					$(Self::$variant => KeywordClass::$class,)*
				}
			}
		}
	};
}

keywords! {
	Const => "const", TypeQualifier;
	Volatile => "volatile", TypeQualifier;
	Mutable => "mutable", TypeQualifier;
	Static => "static", StorageClass;
	Extern => "extern", StorageClass;
	Inline => "inline", StorageClass;
	Virtual => "virtual", StorageClass;
	Explicit => "explicit", StorageClass;
	Friend => "friend", StorageClass;
	Constexpr => "constexpr", StorageClass;
	Public => "public", AccessSpecifier;
	Protected => "protected", AccessSpecifier;
	Private => "private", AccessSpecifier;
	Signals => "signals", AccessSpecifier;
	QSignals => "Q_SIGNALS", AccessSpecifier;
	Slots => "slots", AccessSpecifier;
	QSlots => "Q_SLOTS", AccessSpecifier;
	Namespace => "namespace", Structural;
	Class => "class", Structural;
	Struct => "struct", Structural;
	Union => "union", Structural;
	Enum => "enum", Structural;
	Typedef => "typedef", Structural;
	Template => "template", Structural;
	Typename => "typename", Structural;
	Using => "using", Structural;
	Operator => "operator", Structural;
}

impl Display for Keyword {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// The tokenizer mode that produced a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexerMode {
	Declaration,
	FunctionBody,
	MacroCall,
	EnumBody,
	CodeBlock,
	BlockComment,
}

impl Display for LexerMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mode = match self {
			Self::Declaration => "declaration",
			Self::FunctionBody => "function-body",
			Self::MacroCall => "macro-call",
			Self::EnumBody => "enum-body",
			Self::CodeBlock => "code-block",
			Self::BlockComment => "block-comment",
		};
		write!(f, "{mode}")
	}
}

/// A token together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
	pub token: Token,
	/// 1-indexed line of the first character.
	pub line: usize,
	/// Byte range into the tokenized text.
	pub span: Range<usize>,
	pub mode: LexerMode,
}

impl SpannedToken {
	pub fn new(token: Token, line: usize, span: Range<usize>, mode: LexerMode) -> Self {
		Self {
			token,
			line,
			span,
			mode,
		}
	}
}
