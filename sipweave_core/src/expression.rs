//! Evaluation of `#if` / `#elif` conditions.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Display;

use float_cmp::approx_eq;
use logos::Logos;

use crate::SipweaveError;
use crate::SipweaveResult;

/// Nesting limit when a symbol's value refers to other symbols.
const MAX_DEPTH: usize = 32;

/// The name to value table an expression is evaluated against.
pub trait Symbols {
	/// The raw value text of `name`, or `None` when it is not defined.
	fn lookup(&self, name: &str) -> Option<&str>;
}

impl Symbols for HashMap<String, String> {
	fn lookup(&self, name: &str) -> Option<&str> {
		self.get(name).map(String::as_str)
	}
}

/// The result of a numeric evaluation.
#[derive(Debug, Clone, Copy)]
pub enum Value {
	Int(i64),
	Float(f64),
	Bool(bool),
}

impl Value {
	pub fn is_truthy(self) -> bool {
		match self {
			Self::Int(value) => value != 0,
			Self::Float(value) => !approx_eq!(f64, value, 0.0, ulps = 2),
			Self::Bool(value) => value,
		}
	}

	fn as_int(self) -> i64 {
		match self {
			Self::Int(value) => value,
			Self::Float(value) => value as i64,
			Self::Bool(value) => i64::from(value),
		}
	}

	fn as_float(self) -> f64 {
		match self {
			Self::Int(value) => value as f64,
			Self::Float(value) => value,
			Self::Bool(value) => f64::from(u8::from(value)),
		}
	}

	fn is_float(self) -> bool {
		matches!(self, Self::Float(_))
	}
}

impl Eq for Value {}
impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Float(_), _) | (_, Self::Float(_)) => {
				approx_eq!(f64, self.as_float(), other.as_float(), ulps = 2)
			}
			(Self::Bool(left), Self::Bool(right)) => left == right,
			_ => self.as_int() == other.as_int(),
		}
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int(value) => write!(f, "{value}"),
			Self::Float(value) => write!(f, "{value}"),
			Self::Bool(value) => write!(f, "{value}"),
		}
	}
}

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum ExprToken {
	#[regex(r"[0-9][0-9A-Za-z_.]*")]
	#[regex(r"\.[0-9][0-9A-Za-z_]*")]
	Number,
	#[regex(r"'([^'\\\n]|\\.)*'")]
	Char,
	#[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
	Ident,
	#[token("(")]
	LParen,
	#[token(")")]
	RParen,
	#[token("?")]
	Question,
	#[token(":")]
	Colon,
	#[token("||")]
	OrOr,
	#[token("&&")]
	AndAnd,
	#[token("|")]
	Pipe,
	#[token("^")]
	Caret,
	#[token("&")]
	Amp,
	#[token("==")]
	EqEq,
	#[token("!=")]
	NotEq,
	#[token("<")]
	Lt,
	#[token("<=")]
	LtEq,
	#[token(">")]
	Gt,
	#[token(">=")]
	GtEq,
	#[token("<<")]
	Shl,
	#[token(">>")]
	Shr,
	#[token("+")]
	Plus,
	#[token("-")]
	Minus,
	#[token("*")]
	Star,
	#[token("/")]
	Slash,
	#[token("%")]
	Percent,
	#[token("!")]
	Bang,
	#[token("~")]
	Tilde,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnaryOp {
	Negate,
	Plus,
	Not,
	BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
	Or,
	And,
	BitOr,
	BitXor,
	BitAnd,
	Eq,
	NotEq,
	Lt,
	LtEq,
	Gt,
	GtEq,
	Shl,
	Shr,
	Add,
	Sub,
	Mul,
	Div,
	Rem,
}

impl BinaryOp {
	fn from_token(token: ExprToken) -> Option<(Self, u8)> {
		let op = match token {
			ExprToken::OrOr => (Self::Or, 1),
			ExprToken::AndAnd => (Self::And, 2),
			ExprToken::Pipe => (Self::BitOr, 3),
			ExprToken::Caret => (Self::BitXor, 4),
			ExprToken::Amp => (Self::BitAnd, 5),
			ExprToken::EqEq => (Self::Eq, 6),
			ExprToken::NotEq => (Self::NotEq, 6),
			ExprToken::Lt => (Self::Lt, 7),
			ExprToken::LtEq => (Self::LtEq, 7),
			ExprToken::Gt => (Self::Gt, 7),
			ExprToken::GtEq => (Self::GtEq, 7),
			ExprToken::Shl => (Self::Shl, 8),
			ExprToken::Shr => (Self::Shr, 8),
			ExprToken::Plus => (Self::Add, 9),
			ExprToken::Minus => (Self::Sub, 9),
			ExprToken::Star => (Self::Mul, 10),
			ExprToken::Slash => (Self::Div, 10),
			ExprToken::Percent => (Self::Rem, 10),
			_ => return None,
		};

		Some(op)
	}
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
	Literal(Value),
	Symbol(String),
	Defined(String),
	Unary(UnaryOp, Box<Expr>),
	Binary(BinaryOp, Box<Expr>, Box<Expr>),
	Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

struct ExprParser<'a> {
	source: &'a str,
	tokens: Vec<(ExprToken, &'a str)>,
	cursor: usize,
}

impl<'a> ExprParser<'a> {
	fn new(source: &'a str) -> SipweaveResult<Self> {
		let mut tokens = vec![];
		for (result, span) in ExprToken::lexer(source).spanned() {
			let slice = &source[span];
			let Ok(token) = result else {
				return Err(expression_error(
					source,
					format!("unexpected character `{slice}`"),
				));
			};
			tokens.push((token, slice));
		}

		Ok(Self {
			source,
			tokens,
			cursor: 0,
		})
	}

	fn peek(&self) -> Option<ExprToken> {
		self.tokens.get(self.cursor).map(|(token, _)| *token)
	}

	fn next(&mut self) -> Option<(ExprToken, &'a str)> {
		let token = self.tokens.get(self.cursor).copied();
		if token.is_some() {
			self.cursor += 1;
		}
		token
	}

	fn expect(&mut self, expected: ExprToken) -> SipweaveResult<()> {
		match self.next() {
			Some((token, _)) if token == expected => Ok(()),
			Some((_, slice)) => Err(self.error(format!("unexpected `{slice}`"))),
			None => Err(self.error("unexpected end of expression")),
		}
	}

	fn error(&self, reason: impl Into<String>) -> SipweaveError {
		expression_error(self.source, reason)
	}

	fn parse(mut self) -> SipweaveResult<Expr> {
		if self.tokens.is_empty() {
			return Err(self.error("empty expression"));
		}

		let expr = self.parse_ternary()?;
		if let Some((_, slice)) = self.next() {
			return Err(self.error(format!("unexpected `{slice}`")));
		}

		Ok(expr)
	}

	fn parse_ternary(&mut self) -> SipweaveResult<Expr> {
		let condition = self.parse_binary(1)?;
		if self.peek() != Some(ExprToken::Question) {
			return Ok(condition);
		}

		self.cursor += 1;
		let then = self.parse_ternary()?;
		self.expect(ExprToken::Colon)?;
		let otherwise = self.parse_ternary()?;

		Ok(Expr::Ternary(
			Box::new(condition),
			Box::new(then),
			Box::new(otherwise),
		))
	}

	fn parse_binary(&mut self, min_precedence: u8) -> SipweaveResult<Expr> {
		let mut left = self.parse_unary()?;

		while let Some((op, precedence)) = self.peek().and_then(BinaryOp::from_token) {
			if precedence < min_precedence {
				break;
			}

			self.cursor += 1;
			let right = self.parse_binary(precedence + 1)?;
			left = Expr::Binary(op, Box::new(left), Box::new(right));
		}

		Ok(left)
	}

	fn parse_unary(&mut self) -> SipweaveResult<Expr> {
		let op = match self.peek() {
			Some(ExprToken::Minus) => UnaryOp::Negate,
			Some(ExprToken::Plus) => UnaryOp::Plus,
			Some(ExprToken::Bang) => UnaryOp::Not,
			Some(ExprToken::Tilde) => UnaryOp::BitNot,
			_ => return self.parse_primary(),
		};

		self.cursor += 1;
		let operand = self.parse_unary()?;
		Ok(Expr::Unary(op, Box::new(operand)))
	}

	fn parse_primary(&mut self) -> SipweaveResult<Expr> {
		let Some((token, slice)) = self.next() else {
			return Err(self.error("unexpected end of expression"));
		};

		match token {
			ExprToken::Number => {
				parse_number(slice)
					.map(Expr::Literal)
					.map_err(|reason| self.error(reason))
			}
			ExprToken::Char => parse_char(slice)
				.map(|value| Expr::Literal(Value::Int(value)))
				.ok_or_else(|| self.error(format!("invalid character literal {slice}"))),
			ExprToken::Ident if slice == "defined" => self.parse_defined(),
			ExprToken::Ident => Ok(Expr::Symbol(slice.to_string())),
			ExprToken::LParen => {
				let inner = self.parse_ternary()?;
				self.expect(ExprToken::RParen)?;
				Ok(inner)
			}
			_ => Err(self.error(format!("unexpected `{slice}`"))),
		}
	}

	fn parse_defined(&mut self) -> SipweaveResult<Expr> {
		let parenthesized = self.peek() == Some(ExprToken::LParen);
		if parenthesized {
			self.cursor += 1;
		}

		let name = match self.next() {
			Some((ExprToken::Ident, name)) => name.to_string(),
			_ => return Err(self.error("`defined` expects a name")),
		};

		if parenthesized {
			self.expect(ExprToken::RParen)?;
		}

		Ok(Expr::Defined(name))
	}
}

fn expression_error(expression: &str, reason: impl Into<String>) -> SipweaveError {
	SipweaveError::Expression {
		expression: expression.trim().to_string(),
		reason: reason.into(),
	}
}

fn parse_number(text: &str) -> Result<Value, String> {
	let lower = text.to_ascii_lowercase();

	if let Some(hex) = lower.strip_prefix("0x") {
		let digits = hex.trim_end_matches(['u', 'l']);
		return i64::from_str_radix(digits, 16)
			.or_else(|_| u64::from_str_radix(digits, 16).map(|value| value as i64))
			.map(Value::Int)
			.map_err(|_| format!("invalid number `{text}`"));
	}

	if lower.contains('.') || lower.contains('e') {
		let digits = lower.trim_end_matches(['f', 'l']);
		return digits
			.parse::<f64>()
			.map(Value::Float)
			.map_err(|_| format!("invalid number `{text}`"));
	}

	let digits = lower.trim_end_matches(['u', 'l']);
	let parsed = if digits.len() > 1 && digits.starts_with('0') {
		i64::from_str_radix(&digits[1..], 8)
	} else {
		digits.parse::<i64>()
	};

	parsed
		.map(Value::Int)
		.map_err(|_| format!("invalid number `{text}`"))
}

fn parse_char(text: &str) -> Option<i64> {
	let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
	let mut chars = inner.chars();
	let value = match chars.next()? {
		'\\' => {
			match chars.next()? {
				'n' => '\n',
				't' => '\t',
				'r' => '\r',
				'0' => '\0',
				other => other,
			}
		}
		other => other,
	};

	chars.next().is_none().then_some(i64::from(u32::from(value)))
}

struct Evaluator<'a> {
	symbols: &'a dyn Symbols,
	expression: &'a str,
	depth: usize,
}

impl Evaluator<'_> {
	fn error(&self, reason: impl Into<String>) -> SipweaveError {
		expression_error(self.expression, reason)
	}

	fn eval(&self, expr: &Expr) -> SipweaveResult<Value> {
		match expr {
			Expr::Literal(value) => Ok(*value),
			Expr::Defined(name) => Ok(Value::Bool(is_defined(name, self.symbols))),
			Expr::Symbol(name) => self.eval_symbol(name),
			Expr::Unary(op, operand) => {
				let value = self.eval(operand)?;
				match op {
					UnaryOp::Negate if value.is_float() => Ok(Value::Float(-value.as_float())),
					UnaryOp::Negate => Ok(Value::Int(value.as_int().wrapping_neg())),
					UnaryOp::Plus => Ok(value),
					UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
					UnaryOp::BitNot if value.is_float() => {
						Err(self.error("`~` applied to a floating point value"))
					}
					UnaryOp::BitNot => Ok(Value::Int(!value.as_int())),
				}
			}
			Expr::Binary(BinaryOp::And, left, right) => {
				if !self.eval(left)?.is_truthy() {
					return Ok(Value::Bool(false));
				}
				Ok(Value::Bool(self.eval(right)?.is_truthy()))
			}
			Expr::Binary(BinaryOp::Or, left, right) => {
				if self.eval(left)?.is_truthy() {
					return Ok(Value::Bool(true));
				}
				Ok(Value::Bool(self.eval(right)?.is_truthy()))
			}
			Expr::Binary(op, left, right) => {
				let left = self.eval(left)?;
				let right = self.eval(right)?;
				self.apply(*op, left, right)
			}
			Expr::Ternary(condition, then, otherwise) => {
				if self.eval(condition)?.is_truthy() {
					self.eval(then)
				} else {
					self.eval(otherwise)
				}
			}
		}
	}

	fn eval_symbol(&self, name: &str) -> SipweaveResult<Value> {
		let Some(text) = self.symbols.lookup(name) else {
			return Ok(match name {
				"true" => Value::Bool(true),
				_ => Value::Int(0),
			});
		};

		let text = text.trim();
		if text.is_empty() {
			return Ok(Value::Int(0));
		}

		if self.depth >= MAX_DEPTH {
			return Err(self.error(format!("`{name}` expands too deeply")));
		}

		evaluate_at_depth(text, self.symbols, self.depth + 1)
	}

	fn apply(&self, op: BinaryOp, left: Value, right: Value) -> SipweaveResult<Value> {
		let float = left.is_float() || right.is_float();

		let value = match op {
			BinaryOp::Eq => Value::Bool(left == right),
			BinaryOp::NotEq => Value::Bool(left != right),
			BinaryOp::Lt if float => Value::Bool(left.as_float() < right.as_float()),
			BinaryOp::LtEq if float => Value::Bool(left.as_float() <= right.as_float()),
			BinaryOp::Gt if float => Value::Bool(left.as_float() > right.as_float()),
			BinaryOp::GtEq if float => Value::Bool(left.as_float() >= right.as_float()),
			BinaryOp::Lt => Value::Bool(left.as_int() < right.as_int()),
			BinaryOp::LtEq => Value::Bool(left.as_int() <= right.as_int()),
			BinaryOp::Gt => Value::Bool(left.as_int() > right.as_int()),
			BinaryOp::GtEq => Value::Bool(left.as_int() >= right.as_int()),
			BinaryOp::Add if float => Value::Float(left.as_float() + right.as_float()),
			BinaryOp::Sub if float => Value::Float(left.as_float() - right.as_float()),
			BinaryOp::Mul if float => Value::Float(left.as_float() * right.as_float()),
			BinaryOp::Div if float => {
				let divisor = right.as_float();
				if approx_eq!(f64, divisor, 0.0, ulps = 2) {
					return Err(self.error("division by zero"));
				}
				Value::Float(left.as_float() / divisor)
			}
			BinaryOp::Add => Value::Int(left.as_int().wrapping_add(right.as_int())),
			BinaryOp::Sub => Value::Int(left.as_int().wrapping_sub(right.as_int())),
			BinaryOp::Mul => Value::Int(left.as_int().wrapping_mul(right.as_int())),
			BinaryOp::Div | BinaryOp::Rem => {
				let divisor = right.as_int();
				if divisor == 0 {
					return Err(self.error("division by zero"));
				}
				if op == BinaryOp::Div {
					Value::Int(left.as_int().wrapping_div(divisor))
				} else {
					Value::Int(left.as_int().wrapping_rem(divisor))
				}
			}
			BinaryOp::Shl | BinaryOp::Shr | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor
				if float =>
			{
				return Err(self.error("bitwise operator applied to a floating point value"));
			}
			BinaryOp::Shl => {
				let shift = u32::try_from(right.as_int()).unwrap_or(u32::MAX);
				Value::Int(left.as_int().checked_shl(shift).unwrap_or(0))
			}
			BinaryOp::Shr => {
				let shift = u32::try_from(right.as_int()).unwrap_or(u32::MAX);
				Value::Int(left.as_int().checked_shr(shift).unwrap_or(0))
			}
			BinaryOp::BitAnd => Value::Int(left.as_int() & right.as_int()),
			BinaryOp::BitOr => Value::Int(left.as_int() | right.as_int()),
			BinaryOp::BitXor => Value::Int(left.as_int() ^ right.as_int()),
			BinaryOp::And => Value::Bool(left.is_truthy() && right.is_truthy()),
			BinaryOp::Or => Value::Bool(left.is_truthy() || right.is_truthy()),
		};

		Ok(value)
	}
}

fn evaluate_at_depth(
	expression: &str,
	symbols: &dyn Symbols,
	depth: usize,
) -> SipweaveResult<Value> {
	let expr = ExprParser::new(expression)?.parse()?;
	let evaluator = Evaluator {
		symbols,
		expression,
		depth,
	};

	evaluator.eval(&expr)
}

/// Evaluate a conditional expression in numeric mode.
///
/// Identifiers resolve through `symbols`. A symbol's value is itself
/// evaluated as an expression; undefined identifiers are `0`.
pub fn evaluate(expression: &str, symbols: &dyn Symbols) -> SipweaveResult<Value> {
	evaluate_at_depth(expression, symbols, 0)
}

/// Definedness mode, as used by `#ifdef` and `#ifndef`.
pub fn is_defined(name: &str, symbols: &dyn Symbols) -> bool {
	symbols.lookup(name.trim()).is_some()
}

/// Evaluate `expression` for a conditional branch. A malformed expression is
/// reported and treated as false.
pub fn evaluate_condition(expression: &str, symbols: &dyn Symbols) -> bool {
	match evaluate(expression, symbols) {
		Ok(value) => value.is_truthy(),
		Err(error) => {
			tracing::warn!("{error}; treating the condition as false");
			false
		}
	}
}
