use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Display;
use std::path::PathBuf;

use derive_more::Deref;
use derive_more::DerefMut;

/// Member visibility. Outside a class body everything is `Public`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
	#[default]
	Public,
	Protected,
	Private,
	/// Qt `signals:` sections.
	Signal,
}

impl Display for Access {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let label = match self {
			Self::Public => "public",
			Self::Protected => "protected",
			Self::Private => "private",
			Self::Signal => "signals",
		};
		write!(f, "{label}")
	}
}

/// Where an entity was declared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
	pub file: Option<PathBuf>,
	/// 1-indexed line number.
	pub line: usize,
}

impl SourceLocation {
	pub fn new(file: Option<PathBuf>, line: usize) -> Self {
		Self { file, line }
	}
}

/// The set of annotations attached to a declaration or argument, e.g.
/// `Transfer`, `PyName=foo`.
///
/// Annotations are deduplicated by name (the part before `=`) so the first
/// value seen wins. Display order is insertion order; equality ignores order.
#[derive(Debug, Clone, Default, Deref)]
pub struct Annotations(#[deref] Vec<String>);

impl Annotations {
	pub fn new() -> Self {
		Self::default()
	}

	/// The annotation name, without its value.
	pub fn name_of(annotation: &str) -> &str {
		annotation
			.split_once('=')
			.map_or(annotation, |(name, _)| name)
			.trim()
	}

	/// Insert an annotation unless one with the same name is already present.
	/// Returns `true` when the annotation was added.
	pub fn insert(&mut self, annotation: impl Into<String>) -> bool {
		let annotation = annotation.into();
		let annotation = annotation.trim();
		if annotation.is_empty() || self.contains_name(Self::name_of(annotation)) {
			return false;
		}

		self.0.push(annotation.to_string());
		true
	}

	/// Add every annotation from `other` that is not already present.
	pub fn union(&mut self, other: &Annotations) {
		for annotation in other.iter() {
			self.insert(annotation.as_str());
		}
	}

	pub fn contains_name(&self, name: &str) -> bool {
		self.0.iter().any(|existing| Self::name_of(existing) == name)
	}

	/// The value of a `Name=Value` annotation.
	pub fn value_of(&self, name: &str) -> Option<&str> {
		self.0.iter().find_map(|existing| {
			let (key, value) = existing.split_once('=')?;
			(key.trim() == name).then_some(value.trim())
		})
	}
}

impl PartialEq for Annotations {
	fn eq(&self, other: &Self) -> bool {
		let left: BTreeSet<&String> = self.0.iter().collect();
		let right: BTreeSet<&String> = other.0.iter().collect();
		left == right
	}
}

impl Eq for Annotations {}

impl<S: Into<String>> FromIterator<S> for Annotations {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		let mut annotations = Self::new();
		for annotation in iter {
			annotations.insert(annotation);
		}
		annotations
	}
}

impl Display for Annotations {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0.join(","))
	}
}

/// A freeform `%Name ... %End` block. The body keeps its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
	pub name: String,
	pub body: String,
}

impl CodeBlock {
	pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			body: body.into(),
		}
	}
}

/// An ordered list of child entities. Declaration order is preserved from
/// parsing through serialization.
#[derive(Debug, Clone, PartialEq, Default, Deref, DerefMut)]
pub struct Scope(
	#[deref]
	#[deref_mut]
	Vec<Entity>,
);

impl Scope {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn into_entities(self) -> Vec<Entity> {
		self.0
	}

	/// Find the first direct child with the given name.
	pub fn find(&self, name: &str) -> Option<&Entity> {
		self.0
			.iter()
			.find(|entity| entity.name.as_deref() == Some(name))
	}

	pub fn find_mut(&mut self, name: &str) -> Option<&mut Entity> {
		self.0
			.iter_mut()
			.find(|entity| entity.name.as_deref() == Some(name))
	}

	/// Follow a `::` separated path through nested scopes.
	pub fn find_path_mut(&mut self, path: &str) -> Option<&mut Entity> {
		let mut parts = path.split("::");
		let first = parts.next()?;
		let mut current = self.find_mut(first)?;
		for part in parts {
			current = current.scope_mut()?.find_mut(part)?;
		}
		Some(current)
	}

	/// Entities that are neither ignored nor trivia.
	pub fn active(&self) -> impl Iterator<Item = &Entity> {
		self.0
			.iter()
			.filter(|entity| entity.is_active() && !entity.is_trivia())
	}
}

impl From<Vec<Entity>> for Scope {
	fn from(entities: Vec<Entity>) -> Self {
		Self(entities)
	}
}

impl FromIterator<Entity> for Scope {
	fn from_iter<I: IntoIterator<Item = Entity>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}

/// A node of the declaration tree produced by either parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
	pub name: Option<String>,
	pub access: Access,
	pub location: SourceLocation,
	pub annotations: Annotations,
	/// Kept in the tree for round-tripping but excluded from active output.
	pub ignore: bool,
	/// Retained by merge even when the declaration vanished from the source.
	pub force: bool,
	/// Code blocks attached to this declaration, in order.
	pub blocks: Vec<CodeBlock>,
	/// The doc comment that preceded the declaration in the header.
	pub doc: Option<String>,
	/// A `// ...` comment written after the declaration on the same line.
	pub trailing_comment: Option<String>,
	pub kind: EntityKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
	Namespace(Scope),
	Class(Class),
	Typedef(Typedef),
	Enum(Enum),
	Function(Function),
	Variable(Variable),
	MacroReference(MacroReference),
	Comment(Comment),
	/// A `%Directive` kept verbatim, together with its `{ ... };` body if
	/// it has one.
	Directive(String),
	/// A code block that is not attached to any declaration.
	CodeBlock(CodeBlock),
	/// A `%If (EXPR) ... %End` guard.
	Conditional(Conditional),
}

impl Entity {
	pub fn new(kind: EntityKind) -> Self {
		Self {
			name: None,
			access: Access::Public,
			location: SourceLocation::default(),
			annotations: Annotations::new(),
			ignore: false,
			force: false,
			blocks: vec![],
			doc: None,
			trailing_comment: None,
			kind,
		}
	}

	#[must_use]
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	#[must_use]
	pub fn with_name(mut self, name: Option<String>) -> Self {
		self.name = name;
		self
	}

	#[must_use]
	pub fn with_access(mut self, access: Access) -> Self {
		self.access = access;
		self
	}

	#[must_use]
	pub fn at(mut self, location: SourceLocation) -> Self {
		self.location = location;
		self
	}

	#[must_use]
	pub fn with_annotations(mut self, annotations: Annotations) -> Self {
		self.annotations = annotations;
		self
	}

	#[must_use]
	pub fn with_doc(mut self, doc: Option<String>) -> Self {
		self.doc = doc;
		self
	}

	#[must_use]
	pub fn with_trailing_comment(mut self, comment: impl Into<String>) -> Self {
		self.trailing_comment = Some(comment.into());
		self
	}

	#[must_use]
	pub fn with_block(mut self, block: CodeBlock) -> Self {
		self.blocks.push(block);
		self
	}

	#[must_use]
	pub fn ignored(mut self, ignore: bool) -> Self {
		self.ignore = ignore;
		self
	}

	#[must_use]
	pub fn forced(mut self, force: bool) -> Self {
		self.force = force;
		self
	}

	pub fn is_active(&self) -> bool {
		!self.ignore
	}

	/// Comments, directives and standalone code blocks: nodes that carry no
	/// declaration identity.
	pub fn is_trivia(&self) -> bool {
		matches!(
			self.kind,
			EntityKind::Comment(_) | EntityKind::Directive(_) | EntityKind::CodeBlock(_)
		)
	}

	pub fn name_or_empty(&self) -> &str {
		self.name.as_deref().unwrap_or_default()
	}

	/// The child scope of entities that own one.
	pub fn scope(&self) -> Option<&Scope> {
		match &self.kind {
			EntityKind::Namespace(scope) => Some(scope),
			EntityKind::Class(class) => Some(&class.scope),
			EntityKind::Conditional(conditional) => Some(&conditional.scope),
			EntityKind::Typedef(typedef) => typedef.scope.as_ref(),
			EntityKind::Enum(_)
			| EntityKind::Function(_)
			| EntityKind::Variable(_)
			| EntityKind::MacroReference(_)
			| EntityKind::Comment(_)
			| EntityKind::Directive(_)
			| EntityKind::CodeBlock(_) => None,
		}
	}

	pub fn scope_mut(&mut self) -> Option<&mut Scope> {
		match &mut self.kind {
			EntityKind::Namespace(scope) => Some(scope),
			EntityKind::Class(class) => Some(&mut class.scope),
			EntityKind::Conditional(conditional) => Some(&mut conditional.scope),
			EntityKind::Typedef(typedef) => typedef.scope.as_mut(),
			EntityKind::Enum(_)
			| EntityKind::Function(_)
			| EntityKind::Variable(_)
			| EntityKind::MacroReference(_)
			| EntityKind::Comment(_)
			| EntityKind::Directive(_)
			| EntityKind::CodeBlock(_) => None,
		}
	}

	pub fn as_class(&self) -> Option<&Class> {
		match &self.kind {
			EntityKind::Class(class) => Some(class),
			_ => None,
		}
	}

	pub fn as_function(&self) -> Option<&Function> {
		match &self.kind {
			EntityKind::Function(function) => Some(function),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<&Enum> {
		match &self.kind {
			EntityKind::Enum(enumeration) => Some(enumeration),
			_ => None,
		}
	}

	pub fn as_typedef(&self) -> Option<&Typedef> {
		match &self.kind {
			EntityKind::Typedef(typedef) => Some(typedef),
			_ => None,
		}
	}

	pub fn as_variable(&self) -> Option<&Variable> {
		match &self.kind {
			EntityKind::Variable(variable) => Some(variable),
			_ => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassKeyword {
	#[default]
	Class,
	Struct,
	Union,
}

impl ClassKeyword {
	/// `private` for `class`, `public` for `struct` and `union`.
	pub fn default_access(self) -> Access {
		match self {
			Self::Class => Access::Private,
			Self::Struct | Self::Union => Access::Public,
		}
	}
}

impl Display for ClassKeyword {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let keyword = match self {
			Self::Class => "class",
			Self::Struct => "struct",
			Self::Union => "union",
		};
		write!(f, "{keyword}")
	}
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Class {
	pub keyword: ClassKeyword,
	pub bases: Vec<String>,
	/// Declared but not defined (`class Foo;`).
	pub opaque: bool,
	/// Configured macros between the class keyword and its name, such as
	/// export macros.
	pub macros: Vec<MacroReference>,
	/// Template parameter text, e.g. `typename T`.
	pub template: Option<String>,
	pub scope: Scope,
}

impl Class {
	pub fn has_macro(&self, name: &str) -> bool {
		self.macros.iter().any(|reference| reference.name == name)
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedefForm {
	/// `typedef QList<Foo> FooList;`
	Plain { target: String },
	/// `typedef struct tag Name;` or `typedef struct { ... } Name;`
	Elaborated { target: String },
	/// `typedef void (*Name)(int);`
	FunctionPointer {
		return_type: String,
		arguments: Vec<Argument>,
	},
}

#[derive(Debug, Clone, PartialEq)]
pub struct Typedef {
	pub form: TypedefForm,
	/// Holds the nested type declaration of `typedef struct { ... } Name;`.
	pub scope: Option<Scope>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Enum {
	/// `enum class` / `enum struct`.
	pub scoped: bool,
	pub enumerators: Vec<Enumerator>,
	/// Comments and blank lines after the last enumerator.
	pub closing_comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Enumerator {
	pub name: String,
	pub value: Option<String>,
	pub annotations: Annotations,
	pub doc: Option<String>,
	/// Written with the `//ig` prefix.
	pub ignore: bool,
	/// Kept by merge after the enumerator vanished from the header.
	pub force: bool,
	/// Comments and blank lines directly above the enumerator.
	pub comments: Vec<Comment>,
	pub trailing_comment: Option<String>,
}

impl Enumerator {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: None,
			annotations: Annotations::new(),
			doc: None,
			ignore: false,
			force: false,
			comments: vec![],
			trailing_comment: None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FunctionKind {
	#[default]
	Function,
	Constructor,
	Destructor,
	Operator,
	CastOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Qualifier {
	Virtual,
	Pure,
	Explicit,
	Static,
	Const,
	Volatile,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Function {
	pub kind: FunctionKind,
	/// Absent for constructors, destructors and cast operators.
	pub return_type: Option<String>,
	pub arguments: Vec<Argument>,
	pub qualifiers: BTreeSet<Qualifier>,
	/// Explicit native signature `[CRET (CARGS)]`.
	pub c_signature: Option<CSignature>,
	pub template: Option<String>,
	/// Declared `= delete`.
	pub deleted: bool,
}

impl Function {
	pub fn has(&self, qualifier: Qualifier) -> bool {
		self.qualifiers.contains(&qualifier)
	}

	pub fn is_special_member(&self) -> bool {
		matches!(
			self.kind,
			FunctionKind::Constructor | FunctionKind::Destructor
		)
	}
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CSignature {
	pub return_type: Option<String>,
	pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Argument {
	pub type_name: String,
	pub name: Option<String>,
	pub default: Option<String>,
	pub annotations: Annotations,
}

impl Argument {
	pub fn new(type_name: impl Into<String>) -> Self {
		Self {
			type_name: type_name.into(),
			..Self::default()
		}
	}

	#[must_use]
	pub fn named(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	#[must_use]
	pub fn with_default(mut self, default: impl Into<String>) -> Self {
		self.default = Some(default.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variable {
	pub type_name: String,
	pub is_static: bool,
}

/// A configured marker macro kept as a tree node, e.g. `Q_OBJECT` or
/// `Q_DECLARE_FLAGS(Flags, Flag)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroReference {
	pub name: String,
	/// `None` for bare macros, the split argument list for call macros.
	pub arguments: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comment {
	/// `// text`, stored without indentation.
	Line(String),
	/// `/* ... */`, stored verbatim including line breaks.
	Block(String),
	Blank,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
	pub expression: String,
	pub scope: Scope,
}

/// Join a scope path and a name with `::`.
pub fn qualify(path: &[String], name: &str) -> String {
	if path.is_empty() {
		name.to_string()
	} else {
		format!("{}::{name}", path.join("::"))
	}
}
