use std::path::Path;

use crate::ParseError;
use crate::model::Access;
use crate::model::CodeBlock;
use crate::model::Comment;
use crate::model::Conditional;
use crate::model::Entity;
use crate::model::EntityKind;
use crate::model::Scope;
use crate::parser::DeclarationParser;
use crate::parser::Dialect;
use crate::parser::Owner;
use crate::parser::ScopeBody;
use crate::sip_lexer::directive_word;
use crate::sip_lexer::tokenize_sip;
use crate::tokens::Token;

/// Blocks that always stand on their own at module level.
pub(crate) const MODULE_BLOCKS: &[&str] = &[
	"Copying",
	"Doc",
	"ExportedDoc",
	"ExportedHeaderCode",
	"Extract",
	"InitialisationCode",
	"ModuleCode",
	"ModuleHeaderCode",
	"PostInitialisationCode",
	"PreInitialisationCode",
	"UnitCode",
	"UnitPostIncludeCode",
];

/// Blocks that belong to the enclosing class or namespace.
pub(crate) const SCOPE_BLOCKS: &[&str] = &[
	"BIGetBufferCode",
	"BIReleaseBufferCode",
	"ConvertFromTypeCode",
	"ConvertToSubClassCode",
	"ConvertToTypeCode",
	"FinalisationCode",
	"GCClearCode",
	"GCTraverseCode",
	"InstanceCode",
	"PickleCode",
	"TypeCode",
	"TypeHeaderCode",
	"TypeHintCode",
];

/// Where a code block attaches in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockPlacement {
	Module,
	Scope,
	Declaration,
}

pub(crate) fn block_placement(name: &str) -> BlockPlacement {
	let word = directive_word(name);
	if MODULE_BLOCKS.contains(&word) {
		BlockPlacement::Module
	} else if SCOPE_BLOCKS.contains(&word) {
		BlockPlacement::Scope
	} else {
		BlockPlacement::Declaration
	}
}

impl DeclarationParser<'_> {
	/// Statements only SIP files contain: comments and blank lines, which
	/// are kept in the tree, directives, code blocks, `%If` and the ignore
	/// and force markers. A comment ending a declaration line is attached to
	/// that declaration.
	pub(crate) fn parse_sip_statement(
		&mut self,
		owner: &Owner,
		access: &mut Access,
		body: &mut ScopeBody,
	) -> Result<(), ParseError> {
		let Some(token) = self.cursor.peek_raw() else {
			return Ok(());
		};

		match token {
			Token::IgnoreMarker => {
				self.pending_ignore = true;
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
			Token::BlankLine => {
				self.push_trivia(EntityKind::Comment(Comment::Blank), *access, body);
			}
			Token::Comment(text) => {
				let comment = if text.starts_with("/*") {
					Comment::Block(text.clone())
				} else {
					Comment::Line(text.clone())
				};
				self.push_trivia(EntityKind::Comment(comment), *access, body);
			}
			Token::TrailingComment(text) => {
				let attaches = body
					.scope
					.last()
					.is_some_and(|entity| !entity.is_trivia() && entity.trailing_comment.is_none());
				if attaches {
					if let Some(entity) = body.scope.last_mut() {
						entity.trailing_comment = Some(text.clone());
					}
					self.cursor.advance();
				} else {
					self.push_trivia(EntityKind::Comment(Comment::Line(text.clone())), *access, body);
				}
			}
			Token::Directive(text) => {
				self.push_trivia(EntityKind::Directive(text.clone()), *access, body);
			}
			Token::CodeBlock { name, body: text } => {
				let block = CodeBlock::new(name.clone(), text.clone());
				self.attach_block(block, owner, *access, body);
			}
			Token::IfBegin(expression) => {
				let leading = self.leading();
				self.cursor.advance();
				let inner = self.parse_scope_body(&Owner::Conditional, access)?;
				let mut entity = Entity::new(EntityKind::Conditional(Conditional {
					expression: expression.clone(),
					scope: inner.scope,
				}));
				entity.blocks = inner.blocks;
				body.scope.push(self.decorate(entity, &leading, *access));
			}
			_ => return Err(self.cursor.error("unexpected token")),
		}

		Ok(())
	}

	fn push_trivia(&mut self, kind: EntityKind, access: Access, body: &mut ScopeBody) {
		let leading = self.leading();
		self.cursor.advance();
		let entity = self.decorate(Entity::new(kind), &leading, access);
		body.scope.push(entity);
	}

	fn attach_block(&mut self, block: CodeBlock, owner: &Owner, access: Access, body: &mut ScopeBody) {
		let placement = block_placement(&block.name);

		let target = match placement {
			BlockPlacement::Module => None,
			BlockPlacement::Scope if *owner == Owner::Root => None,
			BlockPlacement::Scope => {
				self.pending_ignore = false;
				self.cursor.advance();
				body.blocks.push(block);
				return;
			}
			BlockPlacement::Declaration => {
				body.scope.last_mut().filter(|entity| {
					!entity.is_trivia() && !matches!(entity.kind, EntityKind::Conditional(_))
				})
			}
		};

		if let Some(entity) = target {
			self.pending_ignore = false;
			self.cursor.advance();
			entity.blocks.push(block);
			return;
		}

		self.push_trivia(EntityKind::CodeBlock(block), access, body);
	}
}

/// Parse the text of an existing SIP file into a declaration tree.
///
/// Comments, blank lines, directives and code blocks are kept in the tree so
/// that [`write_sip`](crate::write_sip) reproduces them.
pub fn parse_sip(text: &str, file: Option<&Path>) -> Result<Scope, ParseError> {
	let tokens = tokenize_sip(text, file)?;
	DeclarationParser::new(text, &tokens, file, Dialect::Sip).parse_root()
}
