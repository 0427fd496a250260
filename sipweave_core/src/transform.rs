//! Turn a header tree into a SIP tree: filtering, normalization, annotation
//! rules and qualified name expansion.

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;

use crate::SipweaveError;
use crate::SipweaveResult;
use crate::cursor::is_builtin;
use crate::model::Access;
use crate::model::Annotations;
use crate::model::Argument;
use crate::model::Class;
use crate::model::CodeBlock;
use crate::model::Comment;
use crate::model::Conditional;
use crate::model::Entity;
use crate::model::EntityKind;
use crate::model::Enum;
use crate::model::Function;
use crate::model::FunctionKind;
use crate::model::Qualifier;
use crate::model::Scope;
use crate::model::SourceLocation;
use crate::model::Typedef;
use crate::model::TypedefForm;
use crate::model::Variable;
use crate::model::qualify;
use crate::tokens::Keyword;

/// What the index knows about a class.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClassInfo {
	/// Base names as spelled in the header.
	pub bases: Vec<String>,
	/// The enclosing namespaces and classes.
	pub context: Vec<String>,
	pub file: Option<PathBuf>,
}

/// Fully qualified names declared across every header of a run.
#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
	names: HashSet<String>,
	classes: HashMap<String, ClassInfo>,
}

impl SymbolIndex {
	pub fn build(scopes: &[&Scope]) -> Self {
		let mut index = Self::default();
		for scope in scopes {
			index.add_scope(scope, &[]);
		}
		index
	}

	fn add_scope(&mut self, scope: &Scope, path: &[String]) {
		for entity in scope.iter() {
			let Some(name) = &entity.name else {
				if let Some(inner) = entity.scope() {
					if matches!(entity.kind, EntityKind::Namespace(_) | EntityKind::Conditional(_)) {
						self.add_scope(inner, path);
					}
				}
				if let EntityKind::Enum(value) = &entity.kind {
					self.add_enumerators(value, path);
				}
				continue;
			};

			let qualified = qualify(path, name);
			let nested = || {
				let mut nested = path.to_vec();
				nested.push(name.clone());
				nested
			};

			match &entity.kind {
				EntityKind::Namespace(inner) => {
					self.names.insert(qualified);
					self.add_scope(inner, &nested());
				}
				EntityKind::Class(class) => {
					self.names.insert(qualified.clone());
					self.classes.insert(qualified, ClassInfo {
						bases: class.bases.clone(),
						context: path.to_vec(),
						file: entity.location.file.clone(),
					});
					self.add_scope(&class.scope, &nested());
				}
				EntityKind::Enum(value) => {
					self.names.insert(qualified);
					let nested = nested();
					for enumerator in &value.enumerators {
						self.names.insert(qualify(&nested, &enumerator.name));
					}
					if !value.scoped {
						self.add_enumerators(value, path);
					}
				}
				EntityKind::Typedef(typedef) => {
					self.names.insert(qualified.clone());
					let inner = typedef.scope.as_ref().and_then(|scope| scope.first());
					match inner.map(|inner| &inner.kind) {
						Some(EntityKind::Class(class)) => {
							self.classes.insert(qualified, ClassInfo {
								bases: class.bases.clone(),
								context: path.to_vec(),
								file: entity.location.file.clone(),
							});
							self.add_scope(&class.scope, &nested());
						}
						Some(EntityKind::Enum(value)) => {
							let nested = nested();
							for enumerator in &value.enumerators {
								self.names.insert(qualify(&nested, &enumerator.name));
							}
							self.add_enumerators(value, path);
						}
						_ => {}
					}
				}
				EntityKind::Conditional(conditional) => self.add_scope(&conditional.scope, path),
				_ => {}
			}
		}
	}

	fn add_enumerators(&mut self, value: &Enum, path: &[String]) {
		for enumerator in &value.enumerators {
			self.names.insert(qualify(path, &enumerator.name));
		}
	}

	pub fn contains(&self, qualified: &str) -> bool {
		self.names.contains(qualified)
	}

	pub fn class(&self, qualified: &str) -> Option<&ClassInfo> {
		self.classes.get(qualified)
	}

	pub fn classes(&self) -> impl Iterator<Item = (&String, &ClassInfo)> {
		self.classes.iter()
	}

	/// Resolve `name` as seen from `context`: the enclosing scopes from the
	/// innermost outwards, the global scope, then the bases of every
	/// enclosing class.
	pub fn resolve(&self, name: &str, context: &[String]) -> Option<String> {
		if let Some(global) = name.strip_prefix("::") {
			return self.contains(global).then(|| global.to_string());
		}

		if let Some(found) = self.lookup_chain(name, context) {
			return Some(found);
		}

		let mut visited = HashSet::new();
		(1..=context.len()).rev().find_map(|depth| {
			let enclosing = context[..depth].join("::");
			if self.classes.contains_key(&enclosing) {
				self.resolve_in_bases(&enclosing, name, &mut visited)
			} else {
				None
			}
		})
	}

	/// Resolve a base class name of a class declared in `context`.
	pub fn resolve_base(&self, base: &str, context: &[String]) -> Option<String> {
		let base = strip_template_arguments(base);
		self.resolve(base, context)
			.filter(|qualified| self.classes.contains_key(qualified))
	}

	fn lookup_chain(&self, name: &str, context: &[String]) -> Option<String> {
		(0..=context.len()).rev().find_map(|depth| {
			let candidate = qualify(&context[..depth], name);
			self.contains(&candidate).then_some(candidate)
		})
	}

	fn resolve_in_bases(
		&self,
		class: &str,
		name: &str,
		visited: &mut HashSet<String>,
	) -> Option<String> {
		if !visited.insert(class.to_string()) {
			return None;
		}

		let info = self.classes.get(class)?;
		for base in &info.bases {
			let Some(base) = self.lookup_chain(strip_template_arguments(base), &info.context) else {
				continue;
			};

			let candidate = format!("{base}::{name}");
			if self.contains(&candidate) {
				return Some(candidate);
			}

			if let Some(found) = self.resolve_in_bases(&base, name, visited) {
				return Some(found);
			}
		}

		None
	}
}

fn strip_template_arguments(name: &str) -> &str {
	name.split('<').next().unwrap_or(name).trim()
}

/// Which functions an [`AnnotationRule`] applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
	#[default]
	Any,
	Function,
	Constructor,
}

/// Adds annotations to every argument whose type and name match.
#[derive(Debug, Clone)]
pub struct AnnotationRule {
	pub kind: RuleKind,
	parameter_type: Regex,
	parameter_name: Regex,
	pub annotations: Annotations,
}

impl AnnotationRule {
	/// Both patterns must match the whole type or name.
	pub fn new<I, S>(
		kind: RuleKind,
		parameter_type: &str,
		parameter_name: &str,
		annotations: I,
	) -> SipweaveResult<Self>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self {
			kind,
			parameter_type: anchored(parameter_type)?,
			parameter_name: anchored(parameter_name)?,
			annotations: annotations.into_iter().collect(),
		})
	}

	pub fn matches(&self, kind: FunctionKind, argument: &Argument) -> bool {
		let kind_matches = match self.kind {
			RuleKind::Any => true,
			RuleKind::Constructor => kind == FunctionKind::Constructor,
			RuleKind::Function => kind != FunctionKind::Constructor,
		};

		kind_matches
			&& self.parameter_type.is_match(&argument.type_name)
			&& self
				.parameter_name
				.is_match(argument.name.as_deref().unwrap_or_default())
	}
}

fn anchored(pattern: &str) -> SipweaveResult<Regex> {
	Regex::new(&format!("^(?:{pattern})$")).map_err(|error| {
		SipweaveError::InvalidPattern {
			pattern: pattern.to_string(),
			reason: error.to_string(),
		}
	})
}

#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
	/// When non-empty, top level classes must carry one of these macros.
	pub export_macros: Vec<String>,
	/// Base classes removed from every base list.
	pub ignore_bases: Vec<String>,
	/// Names that are not declared in any header but need no warning.
	pub known_types: HashSet<String>,
	pub annotation_rules: Vec<AnnotationRule>,
	/// Prepended to the header file name in generated `#include` lines.
	pub include_prefix: String,
}

/// Compound spellings of builtin types and their canonical form.
const TYPE_NORMALIZATION: &[(&str, &str)] = &[
	("long long int", "long long"),
	("unsigned long long int", "unsigned long long"),
	("unsigned long int", "unsigned long"),
	("unsigned short int", "unsigned short"),
	("short int", "short"),
	("long int", "long"),
	("signed int", "int"),
	("signed short", "short"),
	("signed long", "long"),
];

/// Rewrite compound builtin spellings, e.g. `short int` to `short`.
pub fn normalize_type(type_name: &str) -> String {
	let mut normalized = type_name.to_string();
	for (from, to) in TYPE_NORMALIZATION {
		normalized = replace_words(&normalized, from, to);
	}
	normalized
}

fn is_word_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || c == '_'
}

fn replace_words(text: &str, from: &str, to: &str) -> String {
	let mut output = String::with_capacity(text.len());
	let mut rest = text;

	while let Some(found) = rest.find(from) {
		let before = rest[..found].chars().next_back();
		let after = rest[found + from.len()..].chars().next();
		output.push_str(&rest[..found]);
		if before.is_some_and(is_word_char) || after.is_some_and(is_word_char) {
			output.push_str(from);
		} else {
			output.push_str(to);
		}
		rest = &rest[found + from.len()..];
	}

	output.push_str(rest);
	output
}

/// Call `map` for every identifier path (`a::b::c`) in `text`, replacing
/// it with the returned string.
fn map_identifiers(text: &str, mut map: impl FnMut(&str) -> String) -> String {
	let bytes = text.as_bytes();
	let mut output = String::with_capacity(text.len());
	let mut index = 0;

	while index < bytes.len() {
		let Some(c) = text[index..].chars().next() else {
			break;
		};

		if !c.is_ascii() {
			output.push(c);
			index += c.len_utf8();
			continue;
		}

		if c.is_ascii_digit() {
			let start = index;
			while index < bytes.len() && is_word_char(bytes[index] as char) {
				index += 1;
			}
			output.push_str(&text[start..index]);
			continue;
		}

		let leading_colons = text[index..].starts_with("::")
			&& text[index + 2..].starts_with(|c: char| c.is_ascii_alphabetic() || c == '_');
		if !(c.is_ascii_alphabetic() || c == '_' || leading_colons) {
			output.push(c);
			index += 1;
			continue;
		}

		let start = index;
		if leading_colons {
			index += 2;
		}
		loop {
			while index < bytes.len() && is_word_char(bytes[index] as char) {
				index += 1;
			}
			let continues = text[index..].starts_with("::")
				&& text[index + 2..].starts_with(|c: char| c.is_ascii_alphabetic() || c == '_');
			if !continues {
				break;
			}
			index += 2;
		}

		output.push_str(&map(&text[start..index]));
	}

	output
}

fn is_type_keyword(word: &str) -> bool {
	is_builtin(word)
		|| Keyword::lookup(word).is_some()
		|| matches!(word, "nullptr" | "NULL" | "true" | "false" | "this" | "sizeof")
}

struct Transformer<'a> {
	options: &'a TransformOptions,
	index: &'a SymbolIndex,
	include: String,
	warned: HashSet<String>,
}

impl Transformer<'_> {
	fn qualify_type(&mut self, type_name: &str, context: &[String]) -> String {
		let index = self.index;
		let known = &self.options.known_types;
		let warned = &mut self.warned;

		map_identifiers(type_name, |word| {
			if is_type_keyword(word) {
				return word.to_string();
			}

			if let Some(qualified) = index.resolve(word, context) {
				return qualified;
			}

			if !known.contains(word) && warned.insert(word.to_string()) {
				tracing::warn!("unable to resolve type `{word}`; leaving it unqualified");
			}
			word.to_string()
		})
	}

	/// Qualify a default value that is a single bare name, usually an
	/// enumerator.
	fn qualify_default(&self, value: &str, context: &[String]) -> String {
		let bare = value.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
			&& value.chars().all(is_word_char);

		if !bare || is_type_keyword(value) {
			return value.to_string();
		}

		self.index
			.resolve(value, context)
			.unwrap_or_else(|| value.to_string())
	}

	fn transform_scope(
		&mut self,
		scope: &Scope,
		path: &[String],
		class: Option<&str>,
	) -> Vec<Entity> {
		let mut output = vec![];

		for entity in scope.iter() {
			if class.is_some() && entity.access == Access::Private && !is_private_survivor(entity) {
				continue;
			}

			match &entity.kind {
				EntityKind::Comment(_)
				| EntityKind::Directive(_)
				| EntityKind::CodeBlock(_)
				| EntityKind::MacroReference(_) => {}
				EntityKind::Conditional(conditional) => {
					let inner = self.transform_scope(&conditional.scope, path, class);
					let kind = EntityKind::Conditional(Conditional {
						expression: conditional.expression.clone(),
						scope: Scope::from(inner),
					});
					output.push(base_entity(entity, kind));
				}
				EntityKind::Namespace(inner) => {
					let Some(name) = &entity.name else {
						tracing::debug!("skipping anonymous namespace");
						continue;
					};
					let mut nested = path.to_vec();
					nested.push(name.clone());
					let members = self.transform_scope(inner, &nested, None);
					if members.is_empty() {
						continue;
					}
					let mut namespace = base_entity(entity, EntityKind::Namespace(Scope::from(members)));
					if path.is_empty() {
						namespace.blocks.push(self.header_block());
					}
					output.push(namespace);
				}
				EntityKind::Class(value) => {
					if let Some(transformed) = self.transform_class(entity, value, entity.name.as_deref(), path, class) {
						output.push(transformed);
					}
				}
				EntityKind::Enum(value) => output.push(transform_enum(entity, value, entity.name.clone())),
				EntityKind::Typedef(typedef) => output.extend(self.transform_typedef(entity, typedef, path, class)),
				EntityKind::Function(function) => {
					if let Some(transformed) = self.transform_function(entity, function, path) {
						output.push(transformed);
					}
				}
				EntityKind::Variable(variable) => {
					let variable = Variable {
						type_name: self.qualify_type(&normalize_type(&variable.type_name), path),
						is_static: variable.is_static,
					};
					output.push(base_entity(entity, EntityKind::Variable(variable)));
				}
			}
		}

		output
	}

	fn header_block(&self) -> CodeBlock {
		CodeBlock::new("TypeHeaderCode", self.include.clone())
	}

	fn transform_class(
		&mut self,
		entity: &Entity,
		value: &Class,
		name: Option<&str>,
		path: &[String],
		enclosing: Option<&str>,
	) -> Option<Entity> {
		let Some(name) = name else {
			tracing::debug!("skipping anonymous {}", value.keyword);
			return None;
		};

		if value.opaque || value.template.is_some() {
			tracing::debug!("skipping {} `{name}`", if value.opaque { "opaque class" } else { "class template" });
			return None;
		}

		let exported = self.options.export_macros.is_empty()
			|| self
				.options
				.export_macros
				.iter()
				.any(|export| value.has_macro(export));
		if enclosing.is_none() && !exported {
			tracing::debug!("skipping unexported class `{name}`");
			return None;
		}

		let ignore_bases = &self.options.ignore_bases;
		let kept: Vec<&String> = value
			.bases
			.iter()
			.filter(|base| {
				!ignore_bases
					.iter()
					.any(|ignored| ignored == *base || ignored == strip_template_arguments(base))
			})
			.collect();
		let bases = kept
			.into_iter()
			.map(|base| self.qualify_type(base, path))
			.collect();

		let mut nested = path.to_vec();
		nested.push(name.to_string());
		let members = self.transform_scope(&value.scope, &nested, Some(name));

		let class = Class {
			keyword: value.keyword,
			bases,
			opaque: false,
			macros: vec![],
			template: None,
			scope: Scope::from(members),
		};
		let mut transformed = base_entity(entity, EntityKind::Class(class)).named(name);

		if has_pure_virtual(&value.scope) {
			transformed.annotations.insert("Abstract");
		}
		if enclosing.is_none() {
			transformed.blocks.push(self.header_block());
		}

		Some(transformed)
	}

	fn transform_typedef(
		&mut self,
		entity: &Entity,
		typedef: &Typedef,
		path: &[String],
		enclosing: Option<&str>,
	) -> Vec<Entity> {
		let name = entity.name_or_empty();
		let inner = typedef.scope.as_ref().and_then(|scope| scope.first());

		match inner.map(|inner| (inner, &inner.kind)) {
			Some((inner, EntityKind::Class(value))) => {
				let tag = inner.name.as_deref().unwrap_or(name);
				let class = self.transform_class(inner, value, Some(tag), path, enclosing);
				let mut output: Vec<Entity> = class.into_iter().collect();
				if tag != name && !output.is_empty() {
					let alias = Typedef {
						form: TypedefForm::Plain {
							target: qualify(path, tag),
						},
						scope: None,
					};
					output.push(base_entity(entity, EntityKind::Typedef(alias)));
				}
				output
			}
			Some((inner, EntityKind::Enum(value))) => {
				let tag = inner.name.clone().unwrap_or_else(|| name.to_string());
				vec![transform_enum(inner, value, Some(tag)).with_access(entity.access)]
			}
			_ => {
				let form = match &typedef.form {
					TypedefForm::Plain { target } => {
						TypedefForm::Plain {
							target: self.qualify_type(&normalize_type(target), path),
						}
					}
					TypedefForm::Elaborated { target } => {
						TypedefForm::Elaborated {
							target: self.qualify_type(target, path),
						}
					}
					TypedefForm::FunctionPointer {
						return_type,
						arguments,
					} => {
						TypedefForm::FunctionPointer {
							return_type: self.qualify_type(&normalize_type(return_type), path),
							arguments: arguments
								.iter()
								.map(|argument| self.transform_argument(argument, FunctionKind::Function, path))
								.collect(),
						}
					}
				};
				vec![base_entity(entity, EntityKind::Typedef(Typedef { form, scope: None }))]
			}
		}
	}

	fn transform_function(
		&mut self,
		entity: &Entity,
		function: &Function,
		path: &[String],
	) -> Option<Entity> {
		let name = entity.name_or_empty();

		if function.deleted || function.template.is_some() {
			tracing::debug!("skipping deleted or template function `{name}`");
			return None;
		}

		if matches!(name, "operator=" | "operator++" | "operator--") {
			tracing::debug!("skipping `{name}`");
			return None;
		}

		let return_type = function
			.return_type
			.as_ref()
			.map(|return_type| self.qualify_type(&normalize_type(return_type), path));
		let arguments = function
			.arguments
			.iter()
			.map(|argument| self.transform_argument(argument, function.kind, path))
			.collect();

		let function = Function {
			kind: function.kind,
			return_type,
			arguments,
			qualifiers: function.qualifiers.clone(),
			c_signature: None,
			template: None,
			deleted: false,
		};

		Some(base_entity(entity, EntityKind::Function(function)))
	}

	fn transform_argument(&mut self, argument: &Argument, kind: FunctionKind, path: &[String]) -> Argument {
		let mut transformed = Argument {
			type_name: normalize_type(&argument.type_name),
			name: argument.name.clone(),
			default: argument.default.as_deref().map(|value| {
				match value {
					"true" => "1".to_string(),
					"false" => "0".to_string(),
					_ => self.qualify_default(value, path),
				}
			}),
			annotations: argument.annotations.clone(),
		};

		for rule in &self.options.annotation_rules {
			if rule.matches(kind, &transformed) {
				transformed.annotations.union(&rule.annotations);
			}
		}

		transformed.type_name = self.qualify_type(&transformed.type_name, path);
		transformed
	}
}

/// Private members that are still part of the binding.
fn is_private_survivor(entity: &Entity) -> bool {
	entity.as_function().is_some_and(|function| {
		matches!(function.kind, FunctionKind::Constructor | FunctionKind::Destructor)
	})
}

fn has_pure_virtual(scope: &Scope) -> bool {
	scope.iter().any(|entity| {
		match &entity.kind {
			EntityKind::Function(function) => function.has(Qualifier::Pure),
			EntityKind::Conditional(conditional) => has_pure_virtual(&conditional.scope),
			_ => false,
		}
	})
}

/// A copy of the common attributes of `entity` with a new kind. The doc
/// comment is not carried into the SIP tree.
fn base_entity(entity: &Entity, kind: EntityKind) -> Entity {
	Entity::new(kind)
		.with_name(entity.name.clone())
		.with_access(entity.access)
		.at(entity.location.clone())
		.with_annotations(entity.annotations.clone())
}

fn transform_enum(entity: &Entity, value: &Enum, name: Option<String>) -> Entity {
	let mut value = value.clone();
	for enumerator in &mut value.enumerators {
		enumerator.doc = None;
	}
	base_entity(entity, EntityKind::Enum(value)).with_name(name)
}

/// Transform the tree parsed from `header` into the SIP tree for it.
pub fn transform(
	source: &Scope,
	options: &TransformOptions,
	index: &SymbolIndex,
	header: &Path,
) -> Scope {
	let file_name = header
		.file_name()
		.map(|name| name.to_string_lossy().into_owned())
		.unwrap_or_default();
	let mut transformer = Transformer {
		options,
		index,
		include: format!("#include <{}{file_name}>\n", options.include_prefix),
		warned: HashSet::new(),
	};

	let entities = transformer.transform_scope(source, &[], None);
	let needs_module_code = entities.iter().any(|entity| {
		matches!(
			entity.kind,
			EntityKind::Function(_) | EntityKind::Variable(_) | EntityKind::Enum(_) | EntityKind::Typedef(_)
		)
	});

	let mut units = vec![];
	if needs_module_code {
		let block = CodeBlock::new("ModuleHeaderCode", transformer.include.clone());
		units.push(Entity::new(EntityKind::CodeBlock(block)));
	}
	units.extend(entities);

	let mut output = Vec::with_capacity(units.len() * 2);
	for (position, unit) in units.into_iter().enumerate() {
		if position > 0 {
			output.push(Entity::new(EntityKind::Comment(Comment::Blank)));
		}
		output.push(unit);
	}

	Scope::from(output)
}

/// A by-reference argument without a direction annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanityWarning {
	pub location: SourceLocation,
	/// The qualified function name.
	pub function: String,
	pub argument: String,
	pub type_name: String,
}

impl Display for SanityWarning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if let Some(file) = &self.location.file {
			write!(f, "{}:{}: ", file.display(), self.location.line)?;
		}
		write!(
			f,
			"`{}` argument `{}` of type `{}` has no /In/, /Out/ or /InOut/ annotation",
			self.function, self.argument, self.type_name
		)
	}
}

const DIRECTIONS: &[&str] = &["In", "Out", "InOut"];

/// Whether an argument type passes data out of a call without saying so.
fn needs_direction(type_name: &str) -> bool {
	let type_name = type_name.trim();
	if type_name.starts_with("const ") {
		return false;
	}

	if let Some(base) = type_name.strip_suffix('&') {
		return !base.ends_with('&');
	}

	type_name.strip_suffix('*').is_some_and(|base| {
		let base = base.trim();
		is_builtin(base) && !matches!(base, "void" | "char")
	})
}

/// Flag arguments that are non-const references or pointers to builtin types
/// and carry no direction annotation. Ignored entities are skipped.
pub fn sanity_check(scope: &Scope) -> Vec<SanityWarning> {
	let mut warnings = vec![];
	check_scope(scope, &[], &mut warnings);
	warnings
}

fn check_scope(scope: &Scope, path: &[String], warnings: &mut Vec<SanityWarning>) {
	for entity in scope.iter().filter(|entity| entity.is_active()) {
		match &entity.kind {
			EntityKind::Function(function) => {
				let qualified = qualify(path, entity.name_or_empty());
				for (position, argument) in function.arguments.iter().enumerate() {
					let annotated = DIRECTIONS
						.iter()
						.any(|direction| argument.annotations.contains_name(direction));
					if annotated || !needs_direction(&argument.type_name) {
						continue;
					}

					let warning = SanityWarning {
						location: entity.location.clone(),
						function: qualified.clone(),
						argument: argument
							.name
							.clone()
							.unwrap_or_else(|| format!("arg{position}")),
						type_name: argument.type_name.clone(),
					};
					tracing::warn!("{warning}");
					warnings.push(warning);
				}
			}
			EntityKind::Conditional(conditional) => check_scope(&conditional.scope, path, warnings),
			_ => {
				if let (Some(name), Some(inner)) = (&entity.name, entity.scope()) {
					let mut nested = path.to_vec();
					nested.push(name.clone());
					check_scope(inner, &nested, warnings);
				}
			}
		}
	}
}
