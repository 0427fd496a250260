//! A best-effort, line-oriented conditional preprocessor.
//!
//! The output always has exactly as many lines as the input: directive lines,
//! excluded branches and consumed continuation lines become empty lines so
//! that later error messages keep pointing at the right line.

use std::collections::HashMap;

use regex::NoExpand;
use regex::Regex;

use crate::SipweaveError;
use crate::SipweaveResult;
use crate::expression::Symbols;
use crate::expression::evaluate_condition;
use crate::expression::is_defined;

/// An ordered substitution rule applied to every active line.
#[derive(Debug, Clone)]
pub struct MacroSubstitution {
	/// The macro that registered this rule, for `#undef`.
	pub name: Option<String>,
	pattern: Regex,
	replacement: String,
	literal: bool,
}

impl MacroSubstitution {
	/// A rule from a `#define NAME BODY` directive: the whole word `NAME` is
	/// replaced with `BODY` verbatim.
	pub fn define(name: &str, body: &str) -> SipweaveResult<Self> {
		let source = format!(r"\b{}\b", regex::escape(name));
		let pattern = Regex::new(&source).map_err(|error| {
			SipweaveError::InvalidPattern {
				pattern: source.clone(),
				reason: error.to_string(),
			}
		})?;

		Ok(Self {
			name: Some(name.to_string()),
			pattern,
			replacement: body.to_string(),
			literal: true,
		})
	}

	/// A caller supplied rule. The replacement may reference capture groups
	/// with `$1` / `${name}`.
	pub fn global(pattern: &str, replacement: &str) -> SipweaveResult<Self> {
		let compiled = Regex::new(pattern).map_err(|error| {
			SipweaveError::InvalidPattern {
				pattern: pattern.to_string(),
				reason: error.to_string(),
			}
		})?;

		Ok(Self {
			name: None,
			pattern: compiled,
			replacement: replacement.to_string(),
			literal: false,
		})
	}

	pub fn pattern(&self) -> &str {
		self.pattern.as_str()
	}

	fn apply(&self, line: &str) -> String {
		if self.literal {
			self.pattern
				.replace_all(line, NoExpand(&self.replacement))
				.into_owned()
		} else {
			self.pattern
				.replace_all(line, self.replacement.as_str())
				.into_owned()
		}
	}
}

#[derive(Debug, Clone, Copy)]
struct Branch {
	/// Whether the enclosing text is active.
	parent_active: bool,
	/// Whether some branch of this conditional has been selected.
	taken: bool,
	active: bool,
	seen_else: bool,
}

/// All state of one preprocessing run.
#[derive(Debug, Clone, Default)]
pub struct PreprocessorContext {
	values: HashMap<String, String>,
	macros: Vec<MacroSubstitution>,
	global_values: HashMap<String, String>,
	global_macros: Vec<MacroSubstitution>,
	branches: Vec<Branch>,
	guard: Option<String>,
}

impl Symbols for PreprocessorContext {
	fn lookup(&self, name: &str) -> Option<&str> {
		self.global_values
			.get(name)
			.or_else(|| self.values.get(name))
			.map(String::as_str)
	}
}

impl PreprocessorContext {
	pub fn new(
		global_values: HashMap<String, String>,
		global_macros: Vec<MacroSubstitution>,
	) -> Self {
		Self {
			global_values,
			global_macros,
			..Self::default()
		}
	}

	/// Values registered by `#define` so far.
	pub fn values(&self) -> &HashMap<String, String> {
		&self.values
	}

	/// In-text substitution rules, most recently defined first.
	pub fn macros(&self) -> &[MacroSubstitution] {
		&self.macros
	}

	fn is_active(&self) -> bool {
		self.branches.last().is_none_or(|branch| branch.active)
	}

	/// Filter `text`, returning text with the same number of lines.
	pub fn preprocess(&mut self, text: &str) -> String {
		let lines: Vec<&str> = text.split('\n').collect();
		let mut output: Vec<String> = Vec::with_capacity(lines.len());
		let mut index = 0;

		while index < lines.len() {
			let line = lines[index];

			if !line.trim_start().starts_with('#') {
				if self.is_active() {
					output.push(self.substitute(line));
				} else {
					output.push(String::new());
				}
				index += 1;
				continue;
			}

			let mut logical = line.to_string();
			let mut consumed = 1;
			while logical.trim_end().ends_with('\\') && index + consumed < lines.len() {
				let trimmed = logical.trim_end();
				logical = format!("{} {}", &trimmed[..trimmed.len() - 1], lines[index + consumed]);
				consumed += 1;
			}

			self.directive(&logical, &lines[index + consumed..]);
			output.extend(std::iter::repeat_n(String::new(), consumed));
			index += consumed;
		}

		if !self.branches.is_empty() {
			tracing::warn!(
				"{} conditional block(s) not terminated at end of input",
				self.branches.len()
			);
			self.branches.clear();
		}

		output.join("\n")
	}

	fn substitute(&self, line: &str) -> String {
		let mut line = line.to_string();
		for rule in self.macros.iter().chain(&self.global_macros) {
			line = rule.apply(&line);
		}
		line
	}

	fn directive(&mut self, logical: &str, rest: &[&str]) {
		let stripped = strip_comments(logical);
		let Some((name, argument)) = split_directive(&stripped) else {
			return;
		};

		let active = self.is_active();

		match name {
			"ifdef" | "ifndef" => {
				let word = first_word(argument);
				let defined = is_defined(word, self);
				let condition = if name == "ifdef" { defined } else { !defined };
				if name == "ifndef" && active && is_guard_definition(word, rest) {
					self.guard = Some(word.to_string());
				}
				self.open_branch(active, condition);
			}
			"if" => {
				let condition = active && evaluate_condition(argument, self);
				self.open_branch(active, condition);
			}
			"elif" => {
				let Some(mut branch) = self.branches.pop() else {
					tracing::warn!("`#elif` without a matching `#if`");
					return;
				};
				if branch.seen_else {
					tracing::warn!("`#elif` after `#else`");
				}
				branch.active = false;
				if branch.parent_active && !branch.taken && evaluate_condition(argument, self) {
					branch.active = true;
					branch.taken = true;
				}
				self.branches.push(branch);
			}
			"else" => {
				let Some(branch) = self.branches.last_mut() else {
					tracing::warn!("`#else` without a matching `#if`");
					return;
				};
				branch.active = branch.parent_active && !branch.taken;
				branch.taken = true;
				branch.seen_else = true;
			}
			"endif" => {
				if self.branches.pop().is_none() {
					tracing::warn!("`#endif` without a matching `#if`");
				}
			}
			"define" if active => self.define(argument),
			"undef" if active => self.undefine(first_word(argument)),
			_ => {}
		}
	}

	fn open_branch(&mut self, parent_active: bool, condition: bool) {
		self.branches.push(Branch {
			parent_active,
			taken: condition,
			active: parent_active && condition,
			seen_else: false,
		});
	}

	fn define(&mut self, argument: &str) {
		let name_end = argument
			.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
			.unwrap_or(argument.len());
		let name = &argument[..name_end];
		if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
			tracing::warn!("malformed `#define {argument}`");
			return;
		}

		let remainder = &argument[name_end..];
		let function_like = remainder.starts_with('(');
		let body = remainder.trim();

		if self.guard.as_deref() == Some(name) && body.is_empty() {
			self.guard = None;
			tracing::debug!("skipping include guard `{name}`");
			return;
		}

		if function_like {
			self.values.insert(name.to_string(), String::new());
			return;
		}

		self.values.insert(name.to_string(), body.to_string());
		self.macros.retain(|rule| rule.name.as_deref() != Some(name));
		match MacroSubstitution::define(name, body) {
			Ok(rule) => self.macros.insert(0, rule),
			Err(error) => tracing::warn!("{error}"),
		}
	}

	fn undefine(&mut self, name: &str) {
		self.values.remove(name);
		self.macros.retain(|rule| rule.name.as_deref() != Some(name));
	}
}

fn first_word(text: &str) -> &str {
	text.split_whitespace().next().unwrap_or_default()
}

/// `#ifndef G` directly followed, ignoring blank lines, by an empty
/// `#define G`.
fn is_guard_definition(name: &str, rest: &[&str]) -> bool {
	let Some(next) = rest.iter().find(|line| !line.trim().is_empty()) else {
		return false;
	};

	let stripped = strip_comments(next);
	split_directive(&stripped)
		.is_some_and(|(directive, argument)| directive == "define" && argument == name)
}

/// Split `#  name  argument` into its directive name and trimmed argument.
fn split_directive(line: &str) -> Option<(&str, &str)> {
	let rest = line.trim_start().strip_prefix('#')?.trim_start();
	let name_end = rest
		.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
		.unwrap_or(rest.len());

	Some((&rest[..name_end], rest[name_end..].trim()))
}

/// Remove `/* ... */` and `// ...` comments from a directive line.
fn strip_comments(line: &str) -> String {
	let mut output = String::with_capacity(line.len());
	let mut rest = line;

	loop {
		let block = rest.find("/*");
		let slash = rest.find("//");
		match (block, slash) {
			(Some(start), Some(comment)) if comment < start => {
				output.push_str(&rest[..comment]);
				return output;
			}
			(None, Some(comment)) => {
				output.push_str(&rest[..comment]);
				return output;
			}
			(Some(start), _) => {
				output.push_str(&rest[..start]);
				output.push(' ');
				match rest[start + 2..].find("*/") {
					Some(end) => rest = &rest[start + 2 + end + 2..],
					None => return output,
				}
			}
			(None, None) => {
				output.push_str(rest);
				return output;
			}
		}
	}
}
