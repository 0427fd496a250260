use crate::cursor::is_reference_or_pointer;
use crate::model::Access;
use crate::model::Annotations;
use crate::model::Argument;
use crate::model::Class;
use crate::model::CodeBlock;
use crate::model::Comment;
use crate::model::Entity;
use crate::model::EntityKind;
use crate::model::Enum;
use crate::model::Function;
use crate::model::FunctionKind;
use crate::model::Qualifier;
use crate::model::Scope;
use crate::model::Typedef;
use crate::model::TypedefForm;
use crate::model::Variable;
use crate::sip_lexer::FORCE_BEGIN;
use crate::sip_lexer::FORCE_END;
use crate::sip_lexer::IGNORE_MARKER;

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, Default)]
struct Frame {
	indent: usize,
	ignored: bool,
	forced: bool,
}

impl Frame {
	fn nested(self, entity: &Entity) -> Self {
		Self {
			indent: self.indent,
			ignored: self.ignored || entity.ignore,
			forced: self.forced || entity.force,
		}
	}

	fn indented(self) -> Self {
		Self {
			indent: self.indent + 1,
			..self
		}
	}
}

#[derive(Debug, Default)]
struct SipWriter {
	output: String,
}

impl SipWriter {
	fn line(&mut self, frame: Frame, text: &str) {
		if text.is_empty() {
			if frame.ignored {
				self.output.push_str(IGNORE_MARKER);
			}
			self.output.push('\n');
			return;
		}

		if frame.ignored {
			self.output.push_str(IGNORE_MARKER);
			self.output.push(' ');
		}
		for _ in 0..frame.indent {
			self.output.push_str(INDENT);
		}
		self.output.push_str(text);
		self.output.push('\n');
	}

	/// A line written at column zero regardless of nesting.
	fn flush_line(&mut self, frame: Frame, text: &str) {
		self.line(Frame { indent: 0, ..frame }, text);
	}

	fn write_scope(&mut self, scope: &Scope, frame: Frame, access: &mut Option<Access>) {
		let entities: Vec<&Entity> = scope
			.iter()
			.filter(|entity| !matches!(entity.kind, EntityKind::MacroReference(_)))
			.collect();
		let mut index = 0;

		while index < entities.len() {
			if entities[index].force && !frame.forced {
				let group = entities[index..]
					.iter()
					.take_while(|entity| entity.force)
					.count();
				self.output.push_str(FORCE_BEGIN);
				self.output.push('\n');
				for entity in &entities[index..index + group] {
					self.write_entity(entity, Frame { forced: true, ..frame }, access);
				}
				self.output.push_str(FORCE_END);
				self.output.push('\n');
				index += group;
				continue;
			}

			self.write_entity(entities[index], frame, access);
			index += 1;
		}
	}

	fn write_access(&mut self, entity: &Entity, frame: Frame, access: &mut Option<Access>) {
		let Some(current) = access.as_mut() else {
			return;
		};

		if entity.is_trivia() || matches!(entity.kind, EntityKind::Conditional(_)) {
			return;
		}

		if *current != entity.access {
			*current = entity.access;
			let label_frame = Frame {
				indent: frame.indent.saturating_sub(1),
				..frame
			};
			self.line(label_frame, &format!("{}:", entity.access));
		}
	}

	fn write_entity(&mut self, entity: &Entity, frame: Frame, access: &mut Option<Access>) {
		self.write_access(entity, frame, access);
		let frame = frame.nested(entity);

		match &entity.kind {
			EntityKind::Comment(comment) => self.write_comments(std::slice::from_ref(comment), frame),
			EntityKind::Directive(text) => {
				for line in text.lines() {
					self.flush_line(frame, line);
				}
			}
			EntityKind::CodeBlock(block) => self.write_block(block, frame),
			EntityKind::MacroReference(_) => {}
			EntityKind::Namespace(scope) => {
				let header = match &entity.name {
					Some(name) => format!("namespace {name}"),
					None => "namespace".to_string(),
				};
				self.line(frame, &with_annotations(header, &entity.annotations));
				self.line(frame, "{");
				self.write_blocks(&entity.blocks, frame);
				self.write_scope(scope, frame, &mut None);
				self.line(frame, &with_comment("};".to_string(), entity.trailing_comment.as_deref()));
			}
			EntityKind::Class(class) => {
				let closing = with_comment("};".to_string(), entity.trailing_comment.as_deref());
				self.write_class(entity, class, frame, "", &closing);
			}
			EntityKind::Enum(value) => {
				let closing = with_comment("};".to_string(), entity.trailing_comment.as_deref());
				self.write_enum(entity, value, frame, "", &closing);
			}
			EntityKind::Typedef(typedef) => self.write_typedef(entity, typedef, frame),
			EntityKind::Function(function) => {
				if let Some(template) = &function.template {
					self.line(frame, &format!("template<{template}>"));
				}
				let declaration = render_function(entity.name_or_empty(), function, &entity.annotations);
				self.line(frame, &with_comment(declaration, entity.trailing_comment.as_deref()));
				self.write_blocks(&entity.blocks, frame);
			}
			EntityKind::Variable(variable) => {
				let declaration = render_variable(entity.name_or_empty(), variable, &entity.annotations);
				self.line(frame, &with_comment(declaration, entity.trailing_comment.as_deref()));
				self.write_blocks(&entity.blocks, frame);
			}
			EntityKind::Conditional(conditional) => {
				self.flush_line(frame, &format!("%If ({})", conditional.expression));
				self.write_blocks(&entity.blocks, frame);
				self.write_scope(&conditional.scope, frame, access);
				self.flush_line(frame, "%End");
			}
		}
	}

	fn write_comments(&mut self, comments: &[Comment], frame: Frame) {
		for comment in comments {
			match comment {
				Comment::Blank => self.line(frame, ""),
				Comment::Line(text) => self.line(frame, text),
				Comment::Block(text) => {
					let mut lines = text.split('\n');
					if let Some(first) = lines.next() {
						self.line(frame, first);
					}
					for line in lines {
						self.flush_line(frame, line);
					}
				}
			}
		}
	}

	fn write_blocks(&mut self, blocks: &[CodeBlock], frame: Frame) {
		for block in blocks {
			self.write_block(block, frame);
		}
	}

	fn write_block(&mut self, block: &CodeBlock, frame: Frame) {
		self.flush_line(frame, &format!("%{}", block.name));
		for line in block.body.lines() {
			self.flush_line(frame, line);
		}
		self.flush_line(frame, "%End");
	}

	fn write_class(
		&mut self,
		entity: &Entity,
		class: &Class,
		frame: Frame,
		prefix: &str,
		closing: &str,
	) {
		if let Some(template) = &class.template {
			self.line(frame, &format!("template<{template}>"));
		}

		let mut header = format!("{prefix}{}", class.keyword);
		if let Some(name) = &entity.name {
			header.push(' ');
			header.push_str(name);
		}

		if class.opaque {
			header = with_annotations(header, &entity.annotations);
			header.push(';');
			self.line(frame, &with_comment(header, entity.trailing_comment.as_deref()));
			return;
		}

		if !class.bases.is_empty() {
			header.push_str(" : ");
			header.push_str(&class.bases.join(", "));
		}
		self.line(frame, &with_annotations(header, &entity.annotations));
		self.line(frame, "{");
		self.write_blocks(&entity.blocks, frame);
		let mut access = Some(class.keyword.default_access());
		self.write_scope(&class.scope, frame.indented(), &mut access);
		self.line(frame, closing);
	}

	fn write_enum(
		&mut self,
		entity: &Entity,
		value: &Enum,
		frame: Frame,
		prefix: &str,
		closing: &str,
	) {
		let keyword = if value.scoped { "enum class" } else { "enum" };
		let mut header = format!("{prefix}{keyword}");
		if let Some(name) = &entity.name {
			header.push(' ');
			header.push_str(name);
		}

		self.line(frame, &with_annotations(header, &entity.annotations));
		self.line(frame, "{");

		let inner = frame.indented();
		let mut forcing = false;
		for enumerator in &value.enumerators {
			let wants_force = enumerator.force && !frame.forced;
			if wants_force != forcing {
				self.output.push_str(if wants_force { FORCE_BEGIN } else { FORCE_END });
				self.output.push('\n');
				forcing = wants_force;
			}
			self.write_comments(&enumerator.comments, inner);

			let text = with_annotations(enumerator.name.clone(), &enumerator.annotations) + ",";
			let enumerator_frame = Frame {
				ignored: inner.ignored || enumerator.ignore,
				..inner
			};
			self.line(
				enumerator_frame,
				&with_comment(text, enumerator.trailing_comment.as_deref()),
			);
		}
		if forcing {
			self.output.push_str(FORCE_END);
			self.output.push('\n');
		}

		self.write_comments(&value.closing_comments, inner);
		self.line(frame, closing);
		self.write_blocks(&entity.blocks, frame);
	}

	fn write_typedef(&mut self, entity: &Entity, typedef: &Typedef, frame: Frame) {
		let name = entity.name_or_empty();

		if let Some(inner) = typedef.scope.as_ref().and_then(|scope| scope.first()) {
			let closing = with_comment(
				with_annotations(format!("}} {name}"), &entity.annotations) + ";",
				entity.trailing_comment.as_deref(),
			);
			match &inner.kind {
				EntityKind::Class(class) => {
					let class = Class {
						template: None,
						..class.clone()
					};
					self.write_class(inner, &class, frame, "typedef ", &closing);
					return;
				}
				EntityKind::Enum(value) => {
					self.write_enum(inner, value, frame, "typedef ", &closing);
					return;
				}
				_ => {}
			}
		}

		let declaration = match &typedef.form {
			TypedefForm::Plain { target } | TypedefForm::Elaborated { target } => {
				format!("typedef {}", join_declarator(target, name))
			}
			TypedefForm::FunctionPointer {
				return_type,
				arguments,
			} => {
				format!(
					"typedef {} (*{name})({})",
					return_type,
					render_arguments(arguments)
				)
			}
		};

		let declaration = with_annotations(declaration, &entity.annotations) + ";";
		self.line(frame, &with_comment(declaration, entity.trailing_comment.as_deref()));
		self.write_blocks(&entity.blocks, frame);
	}
}

fn with_annotations(mut text: String, annotations: &Annotations) -> String {
	if !annotations.is_empty() {
		text.push_str(&format!(" /{annotations}/"));
	}
	text
}

/// Append a comment kept from the end of the original line.
fn with_comment(mut text: String, comment: Option<&str>) -> String {
	if let Some(comment) = comment {
		text.push(' ');
		text.push_str(comment);
	}
	text
}

/// `TYPE NAME` without a space after a trailing `*` or `&`.
fn join_declarator(type_name: &str, name: &str) -> String {
	if name.is_empty() {
		type_name.to_string()
	} else if is_reference_or_pointer(type_name) {
		format!("{type_name}{name}")
	} else {
		format!("{type_name} {name}")
	}
}

/// Render one argument as it appears in a SIP file.
pub(crate) fn render_argument(argument: &Argument) -> String {
	let mut text = match &argument.name {
		Some(name) if argument.type_name.contains("(*)") => {
			argument.type_name.replacen("(*)", &format!("(*{name})"), 1)
		}
		Some(name) => match argument.type_name.find('[') {
			Some(bracket) => {
				let (base, brackets) = argument.type_name.split_at(bracket);
				format!("{}{brackets}", join_declarator(base, name))
			}
			None => join_declarator(&argument.type_name, name),
		},
		None => argument.type_name.clone(),
	};

	text = with_annotations(text, &argument.annotations);
	if let Some(default) = &argument.default {
		text.push_str(&format!(" = {default}"));
	}
	text
}

pub(crate) fn render_arguments(arguments: &[Argument]) -> String {
	arguments
		.iter()
		.map(render_argument)
		.collect::<Vec<_>>()
		.join(", ")
}

/// Render a function declaration, without indentation or code blocks.
pub(crate) fn render_function(name: &str, function: &Function, annotations: &Annotations) -> String {
	let mut text = String::new();

	if function.has(Qualifier::Virtual) || function.has(Qualifier::Pure) {
		text.push_str("virtual ");
	}
	if function.has(Qualifier::Static) {
		text.push_str("static ");
	}
	if function.has(Qualifier::Explicit) {
		text.push_str("explicit ");
	}

	let signature = format!("{name}({})", render_arguments(&function.arguments));
	match (&function.return_type, function.kind) {
		(Some(return_type), FunctionKind::Function | FunctionKind::Operator) => {
			text.push_str(&join_declarator(return_type, &signature));
		}
		_ => text.push_str(&signature),
	}

	if function.has(Qualifier::Const) {
		text.push_str(" const");
	}
	if function.has(Qualifier::Volatile) {
		text.push_str(" volatile");
	}
	if function.has(Qualifier::Pure) {
		text.push_str(" = 0");
	}

	text = with_annotations(text, annotations);

	if let Some(signature) = &function.c_signature {
		let return_type = signature.return_type.as_deref().unwrap_or_default();
		let arguments = render_arguments(&signature.arguments);
		if return_type.is_empty() {
			text.push_str(&format!(" [({arguments})]"));
		} else {
			text.push_str(&format!(" [{return_type} ({arguments})]"));
		}
	}

	text.push(';');
	text
}

fn render_variable(name: &str, variable: &Variable, annotations: &Annotations) -> String {
	let argument = Argument {
		type_name: variable.type_name.clone(),
		name: Some(name.to_string()),
		default: None,
		annotations: annotations.clone(),
	};

	let mut text = String::new();
	if variable.is_static {
		text.push_str("static ");
	}
	text.push_str(&render_argument(&argument));
	text.push(';');
	text
}

/// Serialize a declaration tree to SIP text.
///
/// Namespace members are not indented, class and enum members are indented
/// by four spaces and code blocks, directives and `%If` / `%End` lines start
/// at column zero. Ignored entities have every line prefixed with `//ig`;
/// runs of forced siblings are wrapped in `//force` and `//end`.
pub fn write_sip(scope: &Scope) -> String {
	let mut writer = SipWriter::default();
	writer.write_scope(scope, Frame::default(), &mut None);
	writer.output
}
