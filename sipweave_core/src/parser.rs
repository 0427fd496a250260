use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Display;
use std::path::Path;

use crate::ParseError;
use crate::cursor::TokenCursor;
use crate::cursor::format_type;
use crate::cursor::is_builtin;
use crate::lexer::LexerOptions;
use crate::lexer::tokenize_source;
use crate::model::Access;
use crate::model::Annotations;
use crate::model::Argument;
use crate::model::CSignature;
use crate::model::Class;
use crate::model::ClassKeyword;
use crate::model::CodeBlock;
use crate::model::Comment;
use crate::model::Entity;
use crate::model::EntityKind;
use crate::model::Enum;
use crate::model::Enumerator;
use crate::model::Function;
use crate::model::FunctionKind;
use crate::model::MacroReference;
use crate::model::Qualifier;
use crate::model::Scope;
use crate::model::SourceLocation;
use crate::model::Typedef;
use crate::model::TypedefForm;
use crate::model::Variable;
use crate::tokens::Keyword;
use crate::tokens::KeywordClass;
use crate::tokens::Punct;
use crate::tokens::SpannedToken;
use crate::tokens::Token;

/// Which textual conventions the token stream follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
	Header,
	Sip,
}

/// The construct whose body is being parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Owner {
	Root,
	Namespace,
	Class {
		keyword: ClassKeyword,
		name: Option<String>,
	},
	ExternC,
	Conditional,
}

impl Display for Owner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Root => write!(f, "file"),
			Self::Namespace => write!(f, "namespace"),
			Self::Class {
				keyword,
				name: Some(name),
			} => write!(f, "{keyword} `{name}`"),
			Self::Class { keyword, name: None } => write!(f, "anonymous {keyword}"),
			Self::ExternC => write!(f, "`extern \"C\"` block"),
			Self::Conditional => write!(f, "`%If` block"),
		}
	}
}

/// The children of a scope and the code blocks that belong to its owner.
#[derive(Debug, Default)]
pub(crate) struct ScopeBody {
	pub(crate) scope: Scope,
	pub(crate) blocks: Vec<CodeBlock>,
}

/// Attributes captured at the start of a statement, before its tokens are
/// consumed.
#[derive(Debug, Clone, Default)]
pub(crate) struct Leading {
	pub(crate) line: usize,
	pub(crate) doc: Option<String>,
	pub(crate) ignore: bool,
	pub(crate) force: bool,
	pub(crate) template: Option<String>,
}

/// A recursive descent parser over either token stream. Scopes are parsed by
/// recursion so every opened scope is closed or the parse fails.
pub(crate) struct DeclarationParser<'a> {
	pub(crate) cursor: TokenCursor<'a>,
	pub(crate) dialect: Dialect,
	pub(crate) pending_doc: Option<String>,
	pub(crate) pending_ignore: bool,
	pub(crate) forcing: bool,
	pending_template: Option<String>,
}

impl<'a> DeclarationParser<'a> {
	pub(crate) fn new(
		source: &'a str,
		tokens: &'a [SpannedToken],
		file: Option<&Path>,
		dialect: Dialect,
	) -> Self {
		Self {
			cursor: TokenCursor::new(source, tokens, file.map(Path::to_path_buf)),
			dialect,
			pending_doc: None,
			pending_ignore: false,
			forcing: false,
			pending_template: None,
		}
	}

	fn is_sip(&self) -> bool {
		self.dialect == Dialect::Sip
	}

	pub(crate) fn parse_root(mut self) -> Result<Scope, ParseError> {
		let mut access = Access::Public;
		let body = self.parse_scope_body(&Owner::Root, &mut access)?;
		Ok(body.scope)
	}

	pub(crate) fn leading(&mut self) -> Leading {
		Leading {
			line: self.cursor.line(),
			doc: self.pending_doc.take(),
			ignore: std::mem::take(&mut self.pending_ignore),
			force: self.forcing,
			template: self.pending_template.take(),
		}
	}

	pub(crate) fn decorate(&self, entity: Entity, leading: &Leading, access: Access) -> Entity {
		entity
			.with_access(access)
			.at(SourceLocation::new(self.cursor.file(), leading.line))
			.with_doc(leading.doc.clone())
			.ignored(leading.ignore)
			.forced(leading.force)
	}

	pub(crate) fn parse_scope_body(
		&mut self,
		owner: &Owner,
		access: &mut Access,
	) -> Result<ScopeBody, ParseError> {
		let mut body = ScopeBody::default();

		loop {
			let Some(token) = self.cursor.peek_raw() else {
				if *owner == Owner::Root {
					return Ok(body);
				}
				return Err(self.cursor.error(format!("unexpected end of input inside {owner}")));
			};

			match token {
				Token::Punct(Punct::RBrace) => {
					if matches!(owner, Owner::Root | Owner::Conditional) {
						return Err(self.cursor.error("unmatched `}`"));
					}
					self.close_scope();
					return Ok(body);
				}
				Token::End => {
					if *owner != Owner::Conditional {
						return Err(self.cursor.error("`%End` without a matching `%If`"));
					}
					self.cursor.advance();
					self.close_scope();
					return Ok(body);
				}
				_ => self.parse_statement(owner, access, &mut body)?,
			}
		}
	}

	fn close_scope(&mut self) {
		self.pending_ignore = false;
		self.pending_doc = None;
		self.pending_template = None;
	}

	fn parse_statement(
		&mut self,
		owner: &Owner,
		access: &mut Access,
		body: &mut ScopeBody,
	) -> Result<(), ParseError> {
		let Some(token) = self.cursor.peek_raw() else {
			return Ok(());
		};

		let entities = match token {
			Token::DocComment(text) => {
				self.pending_doc = Some(text.clone());
				self.cursor.advance();
				return Ok(());
			}
			Token::TrailingDocComment(_) | Token::Punct(Punct::Semicolon) => {
				self.cursor.advance();
				return Ok(());
			}
			Token::Comment(_)
			| Token::TrailingComment(_)
			| Token::BlankLine
			| Token::IgnoreMarker
			| Token::ForceBegin
			| Token::ForceEnd
			| Token::CodeBlock { .. }
			| Token::Directive(_)
			| Token::IfBegin(_) => return self.parse_sip_statement(owner, access, body),
			Token::Keyword(keyword) if keyword.class() == KeywordClass::AccessSpecifier => {
				*access = self.parse_access_specifier(*access)?;
				return Ok(());
			}
			Token::Keyword(Keyword::Template) => {
				self.parse_template_prefix()?;
				return Ok(());
			}
			Token::Keyword(Keyword::Using | Keyword::Friend) => {
				self.skip_statement();
				return Ok(());
			}
			Token::Keyword(Keyword::Extern)
				if matches!(self.cursor.peek_nth(1), Some(Token::StringLiteral(_))) =>
			{
				return self.parse_extern_block(owner, access, body);
			}
			Token::Keyword(Keyword::Namespace) => self.parse_namespace(*access)?,
			Token::Keyword(Keyword::Typedef) => self.parse_typedef(*access)?,
			Token::Keyword(Keyword::Class | Keyword::Struct | Keyword::Union) => {
				let leading = self.leading();
				self.parse_class_statement(owner, *access, leading)?
			}
			Token::Keyword(Keyword::Enum) => {
				let leading = self.leading();
				self.parse_enum_statement(owner, *access, leading)?
			}
			Token::Macro(_) => self.parse_macro_reference(*access),
			_ => {
				let leading = self.leading();
				self.parse_declaration(owner, *access, leading)?
			}
		};

		body.scope.extend(entities);
		Ok(())
	}

	fn parse_access_specifier(&mut self, current: Access) -> Result<Access, ParseError> {
		let access = match self.cursor.peek() {
			Some(Token::Keyword(Keyword::Public)) => Access::Public,
			Some(Token::Keyword(Keyword::Protected)) => Access::Protected,
			Some(Token::Keyword(Keyword::Private)) => Access::Private,
			Some(Token::Keyword(Keyword::Signals | Keyword::QSignals)) => Access::Signal,
			_ => current,
		};

		self.cursor.advance();
		if !self.cursor.eat_keyword(Keyword::Slots) {
			self.cursor.eat_keyword(Keyword::QSlots);
		}
		self.cursor.expect_punct(Punct::Colon)?;

		Ok(access)
	}

	fn parse_template_prefix(&mut self) -> Result<(), ParseError> {
		self.cursor.advance();
		if !self.cursor.is_punct(Punct::LAngle) {
			return Err(self.cursor.error("expected `<` after `template`"));
		}

		let tokens = self.collect_angles()?;
		let inner = &tokens[1..tokens.len().saturating_sub(1).max(1)];
		self.pending_template = Some(format_type(inner));
		Ok(())
	}

	/// Skip a statement the tree does not model, such as `using` or `friend`.
	pub(crate) fn skip_statement(&mut self) {
		let mut depth = 0usize;

		while let Some(token) = self.cursor.peek() {
			match token {
				Token::Punct(Punct::Semicolon) if depth == 0 => {
					self.cursor.advance();
					return;
				}
				Token::Block(_) if depth == 0 => {
					self.cursor.advance();
					self.cursor.eat_punct(Punct::Semicolon);
					return;
				}
				Token::Punct(Punct::RBrace) if depth == 0 => return,
				Token::Punct(Punct::LParen | Punct::LBrace | Punct::LBracket) => depth += 1,
				Token::Punct(Punct::RParen | Punct::RBrace | Punct::RBracket) => {
					depth = depth.saturating_sub(1);
				}
				_ => {}
			}
			self.cursor.advance();
		}
	}

	fn parse_extern_block(
		&mut self,
		owner: &Owner,
		access: &mut Access,
		body: &mut ScopeBody,
	) -> Result<(), ParseError> {
		self.cursor.advance();
		self.cursor.advance();

		if !self.cursor.eat_punct(Punct::LBrace) {
			let leading = self.leading();
			let entities = self.parse_declaration(owner, *access, leading)?;
			body.scope.extend(entities);
			return Ok(());
		}

		let inner = self.parse_scope_body(&Owner::ExternC, access)?;
		self.cursor.expect_punct(Punct::RBrace)?;
		body.scope.extend(inner.scope.into_entities());
		body.blocks.extend(inner.blocks);
		Ok(())
	}

	fn parse_namespace(&mut self, access: Access) -> Result<Vec<Entity>, ParseError> {
		let leading = self.leading();
		self.cursor.advance();

		let mut names = vec![];
		if let Some(Token::Identifier(_)) = self.cursor.peek() {
			names.push(self.cursor.expect_identifier()?);
			while self.cursor.eat_punct(Punct::ColonColon) {
				self.cursor.eat_keyword(Keyword::Inline);
				names.push(self.cursor.expect_identifier()?);
			}
		}

		if self.cursor.is_punct(Punct::Assign) {
			self.skip_statement();
			return Ok(vec![]);
		}

		if self.cursor.is_punct(Punct::Slash) && self.is_sip() {
			self.parse_annotations()?;
		}

		self.cursor.expect_punct(Punct::LBrace)?;
		let mut inner_access = Access::Public;
		let inner = self.parse_scope_body(&Owner::Namespace, &mut inner_access)?;
		self.cursor.expect_punct(Punct::RBrace)?;
		self.cursor.eat_punct(Punct::Semicolon);

		let mut entity = Entity::new(EntityKind::Namespace(inner.scope));
		entity.blocks = inner.blocks;

		let mut names = names.into_iter().rev();
		if let Some(innermost) = names.next() {
			entity = entity.named(innermost);
		}
		for name in names {
			let inner = self.decorate(entity, &leading, access);
			entity = Entity::new(EntityKind::Namespace(Scope::from(vec![inner]))).named(name);
		}

		let entity = self.decorate(entity, &leading, access);
		Ok(vec![entity])
	}

	fn parse_macro_reference(&mut self, access: Access) -> Vec<Entity> {
		let leading = self.leading();
		let reference = self.take_macro();
		self.cursor.eat_punct(Punct::Semicolon);

		match reference {
			Some(reference) => {
				let entity = Entity::new(EntityKind::MacroReference(reference.clone())).named(reference.name);
				vec![self.decorate(entity, &leading, access)]
			}
			None => vec![],
		}
	}

	/// Consume a macro token and its argument list, if any.
	fn take_macro(&mut self) -> Option<MacroReference> {
		let Some(Token::Macro(name)) = self.cursor.peek() else {
			return None;
		};
		self.cursor.advance();

		let arguments = match self.cursor.peek() {
			Some(Token::MacroArguments(arguments)) => {
				self.cursor.advance();
				Some(arguments.clone())
			}
			_ => None,
		};

		Some(MacroReference {
			name: name.clone(),
			arguments,
		})
	}

	fn parse_class_statement(
		&mut self,
		owner: &Owner,
		access: Access,
		leading: Leading,
	) -> Result<Vec<Entity>, ParseError> {
		let start = self.cursor.position();

		match self.parse_class_definition(access, &leading)? {
			Some(entity) => {
				self.skip_declarators()?;
				Ok(vec![entity])
			}
			None => {
				self.cursor.reset(start);
				self.parse_declaration(owner, access, leading)
			}
		}
	}

	/// Parse `class NAME ... ;` or `class NAME ... { ... }` leaving the
	/// cursor after the closing brace. Returns `None` without consuming a
	/// definition when the keyword starts an ordinary declaration instead,
	/// such as `struct Foo *make();`.
	fn parse_class_definition(
		&mut self,
		access: Access,
		leading: &Leading,
	) -> Result<Option<Entity>, ParseError> {
		let keyword = match self.cursor.peek() {
			Some(Token::Keyword(Keyword::Struct)) => ClassKeyword::Struct,
			Some(Token::Keyword(Keyword::Union)) => ClassKeyword::Union,
			_ => ClassKeyword::Class,
		};
		self.cursor.advance();

		let mut macros = vec![];
		while let Some(reference) = self.take_macro() {
			macros.push(reference);
		}

		let mut name = self.parse_qualified_name()?;
		// `class EXPORT_MACRO Name` where the export macro is not configured.
		while let (Some(current), Some(Token::Identifier(word))) = (&name, self.cursor.peek()) {
			if word == "final" || !is_macro_like(current) {
				break;
			}
			macros.push(MacroReference {
				name: current.clone(),
				arguments: None,
			});
			name = self.parse_qualified_name()?;
		}
		if matches!(self.cursor.peek(), Some(Token::Identifier(word)) if word == "final") {
			self.cursor.advance();
		}

		let mut annotations = Annotations::new();
		if self.is_sip() && self.cursor.is_punct(Punct::Slash) {
			annotations.union(&self.parse_annotations()?);
		}

		if self.cursor.is_punct(Punct::Semicolon) && name.is_some() {
			let class = Class {
				keyword,
				opaque: true,
				macros,
				template: leading.template.clone(),
				..Class::default()
			};
			let entity = Entity::new(EntityKind::Class(class))
				.with_name(name)
				.with_annotations(annotations);
			return Ok(Some(self.decorate(entity, leading, access)));
		}

		if !self.cursor.is_punct(Punct::LBrace) && !self.cursor.is_punct(Punct::Colon) {
			return Ok(None);
		}

		let mut bases = vec![];
		if self.cursor.eat_punct(Punct::Colon) {
			loop {
				while matches!(
					self.cursor.peek(),
					Some(Token::Keyword(
						Keyword::Virtual | Keyword::Public | Keyword::Protected | Keyword::Private
					))
				) {
					self.cursor.advance();
				}

				let sip = self.is_sip();
				let tokens = self.collect_type(|token| {
					token.is_punct(Punct::Comma)
						|| token.is_punct(Punct::LBrace)
						|| (sip && token.is_punct(Punct::Slash))
				})?;
				if tokens.is_empty() {
					return Err(self.cursor.error("expected a base class"));
				}
				bases.push(format_type(&tokens));

				if !self.cursor.eat_punct(Punct::Comma) {
					break;
				}
			}
		}

		if self.is_sip() && self.cursor.is_punct(Punct::Slash) {
			annotations.union(&self.parse_annotations()?);
		}

		self.cursor.expect_punct(Punct::LBrace)?;
		let owner = Owner::Class {
			keyword,
			name: name.clone(),
		};
		let mut inner_access = keyword.default_access();
		let inner = self.parse_scope_body(&owner, &mut inner_access)?;
		self.cursor.expect_punct(Punct::RBrace)?;

		let class = Class {
			keyword,
			bases,
			opaque: false,
			macros,
			template: leading.template.clone(),
			scope: inner.scope,
		};
		let mut entity = Entity::new(EntityKind::Class(class))
			.with_name(name)
			.with_annotations(annotations);
		entity.blocks = inner.blocks;

		Ok(Some(self.decorate(entity, leading, access)))
	}

	fn parse_qualified_name(&mut self) -> Result<Option<String>, ParseError> {
		let Some(Token::Identifier(_)) = self.cursor.peek() else {
			return Ok(None);
		};

		let mut name = self.cursor.expect_identifier()?;
		while self.cursor.is_punct(Punct::ColonColon) {
			self.cursor.advance();
			name.push_str("::");
			name.push_str(&self.cursor.expect_identifier()?);
		}

		if self.cursor.is_punct(Punct::LAngle) {
			let tokens = self.collect_angles()?;
			name.push_str(&format_type(&tokens));
		}

		Ok(Some(name))
	}

	/// Skip `name, *other` after a class or enum body and the closing `;`.
	fn skip_declarators(&mut self) -> Result<(), ParseError> {
		while !self.cursor.is_punct(Punct::Semicolon) {
			if self.cursor.is_at_end()
				|| self.cursor.is_punct(Punct::RBrace)
				|| self.cursor.is_punct(Punct::LBrace)
			{
				return Err(self.cursor.error("expected `;`"));
			}
			self.cursor.advance();
		}

		self.cursor.advance();
		Ok(())
	}

	fn parse_enum_statement(
		&mut self,
		owner: &Owner,
		access: Access,
		leading: Leading,
	) -> Result<Vec<Entity>, ParseError> {
		let start = self.cursor.position();

		match self.parse_enum_definition(access, &leading)? {
			EnumStatement::Definition(entity) => {
				self.skip_declarators()?;
				Ok(vec![entity])
			}
			EnumStatement::Forward => Ok(vec![]),
			EnumStatement::Declaration => {
				self.cursor.reset(start);
				self.parse_declaration(owner, access, leading)
			}
		}
	}

	fn parse_enum_definition(
		&mut self,
		access: Access,
		leading: &Leading,
	) -> Result<EnumStatement, ParseError> {
		self.cursor.advance();
		let scoped = self.cursor.eat_keyword(Keyword::Class) || self.cursor.eat_keyword(Keyword::Struct);
		while self.take_macro().is_some() {}

		let name = self.parse_qualified_name()?;

		if self.cursor.eat_punct(Punct::Colon) {
			let sip = self.is_sip();
			self.collect_type(|token| {
				token.is_punct(Punct::LBrace)
					|| token.is_punct(Punct::Semicolon)
					|| (sip && token.is_punct(Punct::Slash))
			})?;
		}

		let mut annotations = Annotations::new();
		if self.is_sip() && self.cursor.is_punct(Punct::Slash) {
			annotations.union(&self.parse_annotations()?);
		}

		if self.cursor.is_punct(Punct::Semicolon) {
			self.cursor.advance();
			tracing::debug!("skipping forward declared enum {name:?}");
			return Ok(EnumStatement::Forward);
		}

		if !self.cursor.is_punct(Punct::LBrace) {
			return Ok(EnumStatement::Declaration);
		}

		self.cursor.advance();
		let (enumerators, closing_comments) = self.parse_enumerators()?;
		self.cursor.expect_punct(Punct::RBrace)?;

		let entity = Entity::new(EntityKind::Enum(Enum {
			scoped,
			enumerators,
			closing_comments,
		}))
		.with_name(name)
		.with_annotations(annotations);

		Ok(EnumStatement::Definition(self.decorate(entity, leading, access)))
	}

	/// The enumerators of an enum body and the comments after the last one.
	/// In SIP files comments, blank lines and the ignore and force markers
	/// stay with the enumerator that follows them.
	fn parse_enumerators(&mut self) -> Result<(Vec<Enumerator>, Vec<Comment>), ParseError> {
		let mut enumerators: Vec<Enumerator> = vec![];
		let mut comments = vec![];
		let mut doc = None;
		let mut ignore = false;

		loop {
			let Some(token) = self.cursor.peek_raw() else {
				return Err(self.cursor.error("unterminated enum body"));
			};

			match token {
				Token::Punct(Punct::RBrace) => return Ok((enumerators, comments)),
				Token::DocComment(text) => {
					doc = Some(text.clone());
					self.cursor.advance();
				}
				Token::TrailingDocComment(text) => {
					if let Some(last) = enumerators.last_mut() {
						last.doc = Some(text.clone());
					}
					self.cursor.advance();
				}
				Token::TrailingComment(text) => {
					match enumerators.last_mut() {
						Some(last) if comments.is_empty() && last.trailing_comment.is_none() => {
							last.trailing_comment = Some(text.clone());
						}
						_ => comments.push(Comment::Line(text.clone())),
					}
					self.cursor.advance();
				}
				Token::Comment(text) => {
					comments.push(if text.starts_with("/*") {
						Comment::Block(text.clone())
					} else {
						Comment::Line(text.clone())
					});
					self.cursor.advance();
				}
				Token::BlankLine => {
					comments.push(Comment::Blank);
					self.cursor.advance();
				}
				Token::IgnoreMarker => {
					ignore = true;
					self.cursor.advance();
				}
				Token::ForceBegin => {
					self.forcing = true;
					self.cursor.advance();
				}
				Token::ForceEnd => {
					self.forcing = false;
					self.cursor.advance();
				}
				Token::Punct(Punct::Comma) => self.cursor.advance(),
				Token::Macro(_) => {
					self.take_macro();
				}
				Token::Identifier(name) => {
					self.cursor.advance();
					let mut enumerator = Enumerator::new(name.clone());
					enumerator.doc = doc.take();
					enumerator.ignore = std::mem::take(&mut ignore);
					enumerator.force = self.forcing;
					enumerator.comments = std::mem::take(&mut comments);
					while self.take_macro().is_some() {}

					if self.is_sip() && self.cursor.is_punct(Punct::Slash) {
						enumerator.annotations.union(&self.parse_annotations()?);
					}

					if self.cursor.eat_punct(Punct::Assign) {
						let sip = self.is_sip();
						let (start, end) = self.skip_value(|token| {
							token.is_punct(Punct::Comma)
								|| token.is_punct(Punct::RBrace)
								|| (sip && token.is_punct(Punct::Slash))
						});
						enumerator.value = Some(self.cursor.text_between(start, end));
					}

					if self.is_sip() && self.cursor.is_punct(Punct::Slash) {
						enumerator.annotations.union(&self.parse_annotations()?);
					}

					enumerators.push(enumerator);
				}
				_ => return Err(self.cursor.error("unexpected token in enum body")),
			}
		}
	}

	fn parse_typedef(&mut self, access: Access) -> Result<Vec<Entity>, ParseError> {
		let leading = self.leading();
		self.cursor.advance();

		let nested_definition = match (self.cursor.peek_nth(0), self.cursor.peek_nth(1), self.cursor.peek_nth(2)) {
			(
				Some(Token::Keyword(Keyword::Class | Keyword::Struct | Keyword::Union | Keyword::Enum)),
				Some(second),
				third,
			) => {
				second.is_punct(Punct::LBrace)
					|| (matches!(second, Token::Identifier(_))
						&& third.is_some_and(|third| {
							third.is_punct(Punct::LBrace) || third.is_punct(Punct::Colon)
						}))
			}
			_ => false,
		};

		if nested_definition {
			return self.parse_typedef_of_definition(access, &leading);
		}

		let sip = self.is_sip();
		let tokens = self.collect_type(|token| {
			token.is_punct(Punct::Semicolon)
				|| token.is_punct(Punct::LParen)
				|| token.is_punct(Punct::LBracket)
				|| (sip && token.is_punct(Punct::Slash))
		})?;

		let (name, form) = if self.cursor.is_punct(Punct::LParen) {
			let return_type = format_type(&tokens);
			let name = self.parse_function_pointer_name()?;
			let arguments = self.parse_arguments()?;
			(name, TypedefForm::FunctionPointer {
				return_type,
				arguments,
			})
		} else {
			let Some((Token::Identifier(name), target)) = tokens.split_last() else {
				return Err(self.cursor.error("expected a typedef name"));
			};

			let mut target = format_type(target);
			if self.cursor.is_punct(Punct::LBracket) {
				let brackets = self.collect_brackets()?;
				target.push_str(&format_type(&brackets));
			}

			let elaborated = matches!(
				tokens.first(),
				Some(Token::Keyword(
					Keyword::Class | Keyword::Struct | Keyword::Union | Keyword::Enum
				))
			);
			let form = if elaborated {
				TypedefForm::Elaborated { target }
			} else {
				TypedefForm::Plain { target }
			};
			(name.clone(), form)
		};

		let mut annotations = Annotations::new();
		if self.is_sip() && self.cursor.is_punct(Punct::Slash) {
			annotations.union(&self.parse_annotations()?);
		}
		self.cursor.expect_punct(Punct::Semicolon)?;

		let entity = Entity::new(EntityKind::Typedef(Typedef { form, scope: None }))
			.named(name)
			.with_annotations(annotations);
		Ok(vec![self.decorate(entity, &leading, access)])
	}

	/// `typedef struct [TAG] { ... } NAME;` and the `enum` equivalent.
	fn parse_typedef_of_definition(
		&mut self,
		access: Access,
		leading: &Leading,
	) -> Result<Vec<Entity>, ParseError> {
		let inner_leading = Leading {
			line: self.cursor.line(),
			..Leading::default()
		};

		let keyword = self.cursor.peek().map(ToString::to_string).unwrap_or_default();
		let inner = if self.cursor.is_keyword(Keyword::Enum) {
			match self.parse_enum_definition(access, &inner_leading)? {
				EnumStatement::Definition(entity) => entity,
				EnumStatement::Forward | EnumStatement::Declaration => {
					return Err(self.cursor.error("expected an enum definition"));
				}
			}
		} else {
			match self.parse_class_definition(access, &inner_leading)? {
				Some(entity) => entity,
				None => return Err(self.cursor.error("expected a class definition")),
			}
		};

		while matches!(self.cursor.peek(), Some(Token::Punct(Punct::Star | Punct::Ampersand))) {
			self.cursor.advance();
		}
		let name = self.cursor.expect_identifier()?;

		let mut annotations = Annotations::new();
		if self.is_sip() && self.cursor.is_punct(Punct::Slash) {
			annotations.union(&self.parse_annotations()?);
		}
		self.skip_declarators()?;

		let target = match &inner.name {
			Some(tag) => format!("{keyword} {tag}"),
			None => keyword,
		};
		let typedef = Typedef {
			form: TypedefForm::Elaborated { target },
			scope: Some(Scope::from(vec![inner])),
		};
		let entity = Entity::new(EntityKind::Typedef(typedef))
			.named(name)
			.with_annotations(annotations);

		Ok(vec![self.decorate(entity, leading, access)])
	}

	/// Parse `(*NAME)` or `(Class::*NAME)` of a function pointer declarator.
	fn parse_function_pointer_name(&mut self) -> Result<String, ParseError> {
		self.cursor.expect_punct(Punct::LParen)?;
		while !self.cursor.eat_punct(Punct::Star) {
			if self.cursor.is_at_end() || self.cursor.is_punct(Punct::RParen) {
				return Err(self.cursor.error("expected `*` in function pointer"));
			}
			self.cursor.advance();
		}
		self.cursor.eat_keyword(Keyword::Const);
		let name = self.cursor.expect_identifier()?;
		self.cursor.expect_punct(Punct::RParen)?;
		Ok(name)
	}

	/// Parse a function or variable declaration.
	pub(crate) fn parse_declaration(
		&mut self,
		owner: &Owner,
		access: Access,
		leading: Leading,
	) -> Result<Vec<Entity>, ParseError> {
		let mut qualifiers = BTreeSet::new();

		loop {
			match self.cursor.peek() {
				Some(Token::Keyword(Keyword::Virtual)) => {
					qualifiers.insert(Qualifier::Virtual);
				}
				Some(Token::Keyword(Keyword::Static)) => {
					qualifiers.insert(Qualifier::Static);
				}
				Some(Token::Keyword(Keyword::Explicit)) => {
					qualifiers.insert(Qualifier::Explicit);
				}
				Some(Token::Keyword(
					Keyword::Inline | Keyword::Constexpr | Keyword::Mutable | Keyword::Extern,
				)) => {}
				Some(Token::Macro(_)) => {
					self.take_macro();
					continue;
				}
				_ => break,
			}
			self.cursor.advance();
		}

		let mut parts: Vec<&'a Token> = vec![];
		let mut has_operator = false;

		loop {
			match self.cursor.peek() {
				None => return Err(self.cursor.error("unexpected end of input in declaration")),
				Some(Token::Keyword(Keyword::Operator)) => {
					has_operator = true;
					break;
				}
				Some(Token::Keyword(Keyword::Static)) => {
					qualifiers.insert(Qualifier::Static);
					self.cursor.advance();
				}
				Some(Token::Keyword(Keyword::Inline | Keyword::Constexpr | Keyword::Mutable)) => {
					self.cursor.advance();
				}
				Some(Token::Macro(_)) => {
					self.take_macro();
				}
				Some(Token::Punct(Punct::LAngle)) => {
					let tokens = self.collect_angles()?;
					parts.extend(tokens);
				}
				Some(
					token @ (Token::Identifier(_)
					| Token::Keyword(
						Keyword::Const
						| Keyword::Volatile
						| Keyword::Typename
						| Keyword::Class
						| Keyword::Struct
						| Keyword::Union
						| Keyword::Enum,
					)
					| Token::Punct(Punct::ColonColon | Punct::Star | Punct::Ampersand | Punct::Tilde)),
				) => {
					parts.push(token);
					self.cursor.advance();
				}
				Some(token @ Token::Operator(op)) if op == "&&" => {
					parts.push(token);
					self.cursor.advance();
				}
				Some(_) => break,
			}
		}

		if has_operator {
			strip_qualification(&mut parts);
			return self.parse_operator(parts, qualifiers, access, &leading).map(|entity| vec![entity]);
		}

		// Destructor.
		if let [.., Token::Punct(Punct::Tilde), Token::Identifier(name)] = parts.as_slice() {
			let name = format!("~{name}");
			let entity = self.parse_function_rest(name, FunctionKind::Destructor, None, qualifiers, access, &leading)?;
			return Ok(vec![entity]);
		}

		let Some((Token::Identifier(last), rest)) = parts.split_last() else {
			return Err(self.cursor.error("expected a declaration"));
		};

		if rest.is_empty() {
			if !self.cursor.is_punct(Punct::LParen) {
				return Err(self.cursor.error("expected a declaration"));
			}

			let is_constructor = matches!(owner, Owner::Class { name: Some(class), .. } if class.rsplit("::").next() == Some(last.as_str()));
			if !is_constructor {
				tracing::debug!("skipping unknown macro invocation `{last}`");
				self.skip_macro_invocation();
				return Ok(vec![]);
			}

			let entity = self.parse_function_rest(
				last.clone(),
				FunctionKind::Constructor,
				None,
				qualifiers,
				access,
				&leading,
			)?;
			return Ok(vec![entity]);
		}

		// `void (*callback)(int);`
		if self.cursor.is_punct(Punct::LParen)
			&& matches!(self.cursor.peek_nth(1), Some(Token::Punct(Punct::Star)))
		{
			let return_type = format_type(&parts);
			let name = self.parse_function_pointer_name()?;
			let arguments = self.parse_arguments()?;
			let type_name = function_pointer_type(&return_type, &arguments);
			self.skip_value(|token| token.is_punct(Punct::Semicolon));
			self.cursor.expect_punct(Punct::Semicolon)?;
			let variable = Variable {
				type_name,
				is_static: qualifiers.contains(&Qualifier::Static),
			};
			let entity = Entity::new(EntityKind::Variable(variable)).named(name);
			return Ok(vec![self.decorate(entity, &leading, access)]);
		}

		let mut type_parts = rest.to_vec();
		strip_qualification(&mut type_parts);

		if is_builtin(last) || matches!(type_parts.last(), None | Some(Token::Punct(Punct::ColonColon))) {
			return Err(self.cursor.error("expected a declarator name"));
		}

		if self.cursor.is_punct(Punct::LParen) {
			let return_type = format_type(&type_parts);
			let entity = self.parse_function_rest(
				last.clone(),
				FunctionKind::Function,
				Some(return_type),
				qualifiers,
				access,
				&leading,
			)?;
			return Ok(vec![entity]);
		}

		self.parse_variables(last, &type_parts, &qualifiers, access, &leading)
	}

	fn skip_macro_invocation(&mut self) {
		let mut depth = 0usize;
		while let Some(token) = self.cursor.peek() {
			match token {
				Token::Punct(Punct::LParen) => depth += 1,
				Token::Punct(Punct::RParen) => {
					depth = depth.saturating_sub(1);
					if depth == 0 {
						self.cursor.advance();
						break;
					}
				}
				_ => {}
			}
			self.cursor.advance();
		}
		self.cursor.eat_punct(Punct::Semicolon);
	}

	fn parse_operator(
		&mut self,
		return_parts: Vec<&'a Token>,
		qualifiers: BTreeSet<Qualifier>,
		access: Access,
		leading: &Leading,
	) -> Result<Entity, ParseError> {
		self.cursor.advance();

		if self.cursor.is_punct(Punct::LParen)
			&& matches!(self.cursor.peek_nth(1), Some(Token::Punct(Punct::RParen)))
		{
			self.cursor.advance();
			self.cursor.advance();
			let return_type = format_type(&return_parts);
			return self.parse_function_rest(
				"operator()".to_string(),
				FunctionKind::Operator,
				Some(return_type),
				qualifiers,
				access,
				leading,
			);
		}

		let mut symbol: Vec<&'a Token> = vec![];
		while let Some(token) = self.cursor.peek() {
			if token.is_punct(Punct::LParen) {
				break;
			}
			if matches!(token, Token::Punct(Punct::Semicolon | Punct::LBrace) | Token::Block(_)) {
				return Err(self.cursor.error("expected `(` after operator"));
			}
			symbol.push(token);
			self.cursor.advance();
		}

		let is_allocation = matches!(
			symbol.first(),
			Some(Token::Identifier(word)) if word == "new" || word == "delete"
		);
		let is_cast = !is_allocation && symbol.first().is_some_and(|token| token.is_word());

		if is_cast {
			let name = format!("operator {}", format_type(&symbol));
			return self.parse_function_rest(name, FunctionKind::CastOperator, None, qualifiers, access, leading);
		}

		let spelled: String = if is_allocation {
			format!(" {}", symbol.iter().map(ToString::to_string).collect::<String>())
		} else {
			symbol.iter().map(ToString::to_string).collect()
		};

		if spelled.trim().is_empty() {
			return Err(self.cursor.error("expected an operator symbol"));
		}

		let return_type = format_type(&return_parts);
		self.parse_function_rest(
			format!("operator{spelled}"),
			FunctionKind::Operator,
			Some(return_type),
			qualifiers,
			access,
			leading,
		)
	}

	/// Parse the argument list and everything after it up to and including
	/// the terminating `;` or body.
	fn parse_function_rest(
		&mut self,
		name: String,
		kind: FunctionKind,
		mut return_type: Option<String>,
		mut qualifiers: BTreeSet<Qualifier>,
		access: Access,
		leading: &Leading,
	) -> Result<Entity, ParseError> {
		let arguments = self.parse_arguments()?;
		let mut annotations = Annotations::new();
		let mut c_signature = None;
		let mut deleted = false;

		loop {
			match self.cursor.peek() {
				Some(Token::Keyword(Keyword::Const)) => {
					qualifiers.insert(Qualifier::Const);
					self.cursor.advance();
				}
				Some(Token::Keyword(Keyword::Volatile)) => {
					qualifiers.insert(Qualifier::Volatile);
					self.cursor.advance();
				}
				Some(Token::Punct(Punct::Ampersand)) => self.cursor.advance(),
				Some(Token::Operator(op)) if op == "&&" => self.cursor.advance(),
				Some(Token::Identifier(word)) if word == "override" || word == "final" => {
					self.cursor.advance();
				}
				Some(Token::Identifier(word)) if word == "noexcept" || word == "throw" => {
					self.cursor.advance();
					if self.cursor.is_punct(Punct::LParen) {
						self.skip_macro_invocation_arguments();
					}
				}
				Some(Token::Macro(_)) => {
					self.take_macro();
				}
				Some(Token::Operator(op)) if op == "->" => {
					self.cursor.advance();
					let tokens = self.collect_type(|token| {
						token.is_punct(Punct::Semicolon)
							|| token.is_punct(Punct::Assign)
							|| matches!(token, Token::Block(_))
					})?;
					return_type = Some(format_type(&tokens));
				}
				Some(Token::Punct(Punct::Assign)) => {
					self.cursor.advance();
					match self.cursor.peek() {
						Some(Token::Number(zero)) if zero == "0" => {
							qualifiers.insert(Qualifier::Pure);
						}
						Some(Token::Identifier(word)) if word == "delete" => deleted = true,
						Some(Token::Identifier(word)) if word == "default" => {}
						_ => return Err(self.cursor.error("expected `0`, `default` or `delete`")),
					}
					self.cursor.advance();
				}
				Some(Token::Punct(Punct::Slash)) if self.is_sip() => {
					annotations.union(&self.parse_annotations()?);
				}
				Some(Token::Punct(Punct::LBracket)) if self.is_sip() => {
					c_signature = Some(self.parse_c_signature()?);
				}
				Some(Token::Block(_)) => {
					self.cursor.advance();
					self.cursor.eat_punct(Punct::Semicolon);
					break;
				}
				Some(Token::Punct(Punct::Semicolon)) => {
					self.cursor.advance();
					break;
				}
				_ => return Err(self.cursor.error("unexpected token after function declarator")),
			}
		}

		let function = Function {
			kind,
			return_type,
			arguments,
			qualifiers,
			c_signature,
			template: leading.template.clone(),
			deleted,
		};
		let entity = Entity::new(EntityKind::Function(function))
			.named(name)
			.with_annotations(annotations);

		Ok(self.decorate(entity, leading, access))
	}

	fn skip_macro_invocation_arguments(&mut self) {
		let mut depth = 0usize;
		while let Some(token) = self.cursor.peek() {
			self.cursor.advance();
			match token {
				Token::Punct(Punct::LParen) => depth += 1,
				Token::Punct(Punct::RParen) => {
					depth = depth.saturating_sub(1);
					if depth == 0 {
						return;
					}
				}
				_ => {}
			}
		}
	}

	fn parse_variables(
		&mut self,
		first_name: &str,
		type_parts: &[&'a Token],
		qualifiers: &BTreeSet<Qualifier>,
		access: Access,
		leading: &Leading,
	) -> Result<Vec<Entity>, ParseError> {
		let is_static = qualifiers.contains(&Qualifier::Static);
		let mut base = type_parts.to_vec();
		while matches!(
			base.last(),
			Some(Token::Punct(Punct::Star | Punct::Ampersand))
		) || matches!(base.last(), Some(Token::Operator(op)) if op == "&&")
		{
			base.pop();
		}

		let mut entities = vec![];
		let mut name = first_name.to_string();
		let mut type_tokens = type_parts.to_vec();

		loop {
			let mut type_name = format_type(&type_tokens);
			if self.cursor.is_punct(Punct::LBracket) {
				let brackets = self.collect_brackets()?;
				type_name.push_str(&format_type(&brackets));
			}

			if self.cursor.eat_punct(Punct::Colon) {
				self.skip_value(|token| token.is_punct(Punct::Comma) || token.is_punct(Punct::Semicolon));
			}

			let mut annotations = Annotations::new();
			if self.is_sip() && self.cursor.is_punct(Punct::Slash) {
				annotations.union(&self.parse_annotations()?);
			}

			if self.cursor.eat_punct(Punct::Assign) || matches!(self.cursor.peek(), Some(Token::Block(_))) {
				self.skip_value(|token| token.is_punct(Punct::Comma) || token.is_punct(Punct::Semicolon));
			}

			let variable = Variable {
				type_name,
				is_static,
			};
			let entity = Entity::new(EntityKind::Variable(variable))
				.named(name.clone())
				.with_annotations(annotations);
			entities.push(self.decorate(entity, leading, access));

			if !self.cursor.eat_punct(Punct::Comma) {
				break;
			}

			type_tokens.clone_from(&base);
			while let Some(token @ Token::Punct(Punct::Star | Punct::Ampersand)) = self.cursor.peek() {
				type_tokens.push(token);
				self.cursor.advance();
			}
			name = self.cursor.expect_identifier()?;
		}

		self.cursor.expect_punct(Punct::Semicolon)?;
		Ok(entities)
	}

	/// Parse `( ARG, ... )`.
	pub(crate) fn parse_arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
		self.cursor.expect_punct(Punct::LParen)?;

		if self.cursor.eat_punct(Punct::RParen) {
			return Ok(vec![]);
		}

		if matches!(self.cursor.peek(), Some(Token::Identifier(word)) if word == "void")
			&& matches!(self.cursor.peek_nth(1), Some(Token::Punct(Punct::RParen)))
		{
			self.cursor.advance();
			self.cursor.advance();
			return Ok(vec![]);
		}

		let mut arguments = vec![];
		loop {
			arguments.push(self.parse_argument()?);

			if self.cursor.eat_punct(Punct::Comma) {
				continue;
			}
			if self.cursor.eat_punct(Punct::RParen) {
				return Ok(arguments);
			}
			return Err(self.cursor.error("expected `,` or `)` in argument list"));
		}
	}

	fn parse_argument(&mut self) -> Result<Argument, ParseError> {
		if self.cursor.eat_punct(Punct::Ellipsis) {
			return Ok(Argument::new("..."));
		}

		let sip = self.is_sip();
		let mut parts = self.collect_type(|token| {
			token.is_punct(Punct::Comma)
				|| token.is_punct(Punct::RParen)
				|| token.is_punct(Punct::Assign)
				|| token.is_punct(Punct::LBracket)
				|| token.is_punct(Punct::LParen)
				|| (sip && token.is_punct(Punct::Slash))
		})?;

		let mut argument = if self.cursor.is_punct(Punct::LParen)
			&& matches!(self.cursor.peek_nth(1), Some(Token::Punct(Punct::Star)))
		{
			let return_type = format_type(&parts);
			let name = self.parse_function_pointer_name()?;
			let arguments = self.parse_arguments()?;
			Argument::new(function_pointer_type(&return_type, &arguments)).named(name)
		} else {
			let name = match parts.split_last() {
				Some((Token::Identifier(name), rest))
					if !is_builtin(name)
						&& rest.last().is_some_and(|before| !before.is_punct(Punct::ColonColon))
						&& rest.iter().any(|token| matches!(token, Token::Identifier(_))) =>
				{
					Some(name.clone())
				}
				_ => None,
			};
			if name.is_some() {
				parts.pop();
			}
			if parts.is_empty() {
				return Err(self.cursor.error("expected an argument type"));
			}

			let mut type_name = format_type(&parts);
			if self.cursor.is_punct(Punct::LBracket) {
				let brackets = self.collect_brackets()?;
				type_name.push_str(&format_type(&brackets));
			}

			let mut argument = Argument::new(type_name);
			argument.name = name;
			argument
		};

		if sip && self.cursor.is_punct(Punct::Slash) {
			argument.annotations.union(&self.parse_annotations()?);
		}

		if self.cursor.eat_punct(Punct::Assign) {
			let (start, end) = self.skip_value(|token| {
				token.is_punct(Punct::Comma) || token.is_punct(Punct::RParen)
			});
			let value = self.cursor.text_between(start, end);
			if value.is_empty() {
				return Err(self.cursor.error("expected a default value"));
			}
			argument.default = Some(value);
		}

		Ok(argument)
	}

	/// Parse `/Anno1,Anno2=Value/`.
	pub(crate) fn parse_annotations(&mut self) -> Result<Annotations, ParseError> {
		self.cursor.expect_punct(Punct::Slash)?;
		let mut annotations = Annotations::new();
		let mut current = String::new();

		loop {
			let Some(spanned) = self.cursor.next() else {
				return Err(self.cursor.error("unterminated annotation list"));
			};

			match &spanned.token {
				Token::Punct(Punct::Slash) => {
					annotations.insert(std::mem::take(&mut current));
					return Ok(annotations);
				}
				Token::Punct(Punct::Comma) => {
					annotations.insert(std::mem::take(&mut current));
				}
				Token::Punct(Punct::Semicolon | Punct::LBrace) => {
					return Err(self.cursor.error("unterminated annotation list"));
				}
				token => current.push_str(&token.to_string()),
			}
		}
	}

	/// Parse `[CRET (CARGS)]`.
	fn parse_c_signature(&mut self) -> Result<CSignature, ParseError> {
		self.cursor.expect_punct(Punct::LBracket)?;
		let tokens = self.collect_type(|token| token.is_punct(Punct::LParen))?;
		let return_type = (!tokens.is_empty()).then(|| format_type(&tokens));
		let arguments = self.parse_arguments()?;
		self.cursor.expect_punct(Punct::RBracket)?;

		Ok(CSignature {
			return_type,
			arguments,
		})
	}

	/// Collect type tokens up to a token matching `stop` at nesting depth
	/// zero. Template argument lists are kept whole; macros are dropped.
	fn collect_type(&mut self, stop: impl Fn(&Token) -> bool) -> Result<Vec<&'a Token>, ParseError> {
		let mut tokens = vec![];

		loop {
			let Some(token) = self.cursor.peek() else {
				return Ok(tokens);
			};

			if stop(token) {
				return Ok(tokens);
			}

			match token {
				Token::Punct(Punct::LAngle) => tokens.extend(self.collect_angles()?),
				Token::Macro(_) => {
					self.take_macro();
				}
				Token::Punct(Punct::Semicolon | Punct::LBrace | Punct::RBrace | Punct::RParen)
				| Token::Block(_) => return Ok(tokens),
				_ => {
					tokens.push(token);
					self.cursor.advance();
				}
			}
		}
	}

	/// Collect a balanced `< ... >` group including the brackets.
	fn collect_angles(&mut self) -> Result<Vec<&'a Token>, ParseError> {
		self.collect_balanced(Punct::LAngle, Punct::RAngle)
	}

	fn collect_brackets(&mut self) -> Result<Vec<&'a Token>, ParseError> {
		self.collect_balanced(Punct::LBracket, Punct::RBracket)
	}

	fn collect_balanced(&mut self, open: Punct, close: Punct) -> Result<Vec<&'a Token>, ParseError> {
		let mut tokens = vec![];
		let mut depth = 0usize;

		loop {
			let Some(token) = self.cursor.peek() else {
				return Err(self.cursor.error(format!("unterminated `{open}`")));
			};

			if matches!(token, Token::Punct(Punct::Semicolon | Punct::LBrace) | Token::Block(_)) {
				return Err(self.cursor.error(format!("expected `{close}`")));
			}

			if token.is_punct(open) {
				depth += 1;
			} else if token.is_punct(close) {
				depth = depth.saturating_sub(1);
			}

			tokens.push(token);
			self.cursor.advance();

			if depth == 0 {
				return Ok(tokens);
			}
		}
	}

	/// Skip an expression up to a token matching `stop` at depth zero.
	/// Returns the token positions the expression spans.
	pub(crate) fn skip_value(&mut self, stop: impl Fn(&Token) -> bool) -> (usize, usize) {
		self.cursor.skip_trivia();
		let start = self.cursor.position();
		let mut parens = 0usize;
		let mut angles = 0usize;
		let mut end = start;

		while let Some(token) = self.cursor.peek() {
			let nested = parens > 0 || angles > 0;
			if !nested && stop(token) {
				break;
			}

			match token {
				Token::Punct(Punct::Semicolon) => break,
				Token::Punct(Punct::RParen | Punct::RBrace) if parens == 0 => break,
				Token::Punct(Punct::LParen | Punct::LBrace | Punct::LBracket) => parens += 1,
				Token::Punct(Punct::RParen | Punct::RBrace | Punct::RBracket) => {
					parens = parens.saturating_sub(1);
				}
				Token::Punct(Punct::LAngle) => angles += 1,
				Token::Punct(Punct::RAngle) => angles = angles.saturating_sub(1),
				_ => {}
			}

			self.cursor.advance();
			end = self.cursor.position();
		}

		(start, end)
	}
}

enum EnumStatement {
	Definition(Entity),
	Forward,
	Declaration,
}

/// Upper case words such as `Q_CORE_EXPORT`.
fn is_macro_like(word: &str) -> bool {
	word.chars().any(|c| c.is_ascii_uppercase())
		&& word
			.chars()
			.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Drop a trailing `Qualifier::` chain, as in `void Foo::bar()`.
fn strip_qualification(parts: &mut Vec<&Token>) {
	while let [.., Token::Identifier(_), Token::Punct(Punct::ColonColon)] = parts.as_slice() {
		parts.truncate(parts.len() - 2);
	}
}

/// The spelled type of a function pointer, e.g. `void (*)(int, bool)`.
pub(crate) fn function_pointer_type(return_type: &str, arguments: &[Argument]) -> String {
	let arguments = arguments
		.iter()
		.map(|argument| argument.type_name.as_str())
		.collect::<Vec<_>>()
		.join(", ");
	format!("{return_type} (*)({arguments})")
}

/// Parse preprocessed header text into a declaration tree.
pub fn parse_source(
	text: &str,
	file: Option<&Path>,
	options: &LexerOptions,
) -> Result<Scope, ParseError> {
	let tokens = tokenize_source(text, file, options)?;
	DeclarationParser::new(text, &tokens, file, Dialect::Header).parse_root()
}
