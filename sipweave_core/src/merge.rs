//! Merge a freshly generated tree into the tree parsed from the existing SIP
//! file, keeping hand edits.

use std::fmt;
use std::fmt::Display;

use crate::model::Annotations;
use crate::model::Argument;
use crate::model::CodeBlock;
use crate::model::Comment;
use crate::model::Conditional;
use crate::model::Entity;
use crate::model::EntityKind;
use crate::model::Enumerator;
use crate::model::Qualifier;
use crate::model::Scope;

/// Identity of an entity across two generations of the same file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MergeKey {
	Namespace(String),
	Class(String),
	Enum(String),
	Typedef(String),
	Variable(String),
	/// `name(types)` with an optional ` const` suffix.
	Function(String),
	Conditional(String),
}

impl Display for MergeKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Namespace(name) => write!(f, "namespace {name}"),
			Self::Class(name) => write!(f, "class {name}"),
			Self::Enum(name) => write!(f, "enum {name}"),
			Self::Typedef(name) => write!(f, "typedef {name}"),
			Self::Variable(name) => write!(f, "variable {name}"),
			Self::Function(signature) => write!(f, "function {signature}"),
			Self::Conditional(expression) => write!(f, "%If ({expression})"),
		}
	}
}

/// The merge identity of an entity. Trivia, macro references and anonymous
/// namespaces and classes have none.
pub fn merge_key(entity: &Entity) -> Option<MergeKey> {
	let name = entity.name.clone();

	match &entity.kind {
		EntityKind::Namespace(_) => name.map(MergeKey::Namespace),
		EntityKind::Class(_) => name.map(MergeKey::Class),
		EntityKind::Typedef(_) => name.map(MergeKey::Typedef),
		EntityKind::Variable(_) => name.map(MergeKey::Variable),
		EntityKind::Enum(value) => {
			name.or_else(|| {
				value
					.enumerators
					.first()
					.map(|first| format!("{{{}}}", first.name))
			})
			.map(MergeKey::Enum)
		}
		EntityKind::Function(function) => {
			let types = function
				.arguments
				.iter()
				.filter(|argument| argument.default.is_none())
				.map(|argument| strip_whitespace(&argument.type_name))
				.collect::<Vec<_>>()
				.join(",");
			let suffix = if function.has(Qualifier::Const) {
				" const"
			} else {
				""
			};
			Some(MergeKey::Function(format!(
				"{}({types}){suffix}",
				entity.name_or_empty()
			)))
		}
		EntityKind::Conditional(conditional) => {
			Some(MergeKey::Conditional(strip_whitespace(&conditional.expression)))
		}
		EntityKind::Comment(_)
		| EntityKind::Directive(_)
		| EntityKind::CodeBlock(_)
		| EntityKind::MacroReference(_) => None,
	}
}

fn strip_whitespace(text: &str) -> String {
	text.chars().filter(|c| !c.is_whitespace()).collect()
}

struct Slot<'c> {
	key: Option<MergeKey>,
	entity: &'c Entity,
	/// Candidate trivia directly before this entity.
	leading: Vec<&'c Entity>,
	taken: bool,
}

/// The candidate entities of one scope, waiting to be matched.
#[derive(Default)]
struct Pool<'c> {
	slots: Vec<Slot<'c>>,
	trailing: Vec<&'c Entity>,
}

impl<'c> Pool<'c> {
	fn new(scope: &'c Scope) -> Self {
		let mut pool = Self::default();
		let mut leading = vec![];

		for entity in scope.iter() {
			if entity.is_trivia() {
				leading.push(entity);
				continue;
			}

			pool.slots.push(Slot {
				key: merge_key(entity),
				entity,
				leading: std::mem::take(&mut leading),
				taken: false,
			});
		}

		pool.trailing = leading;
		pool
	}

	fn take(&mut self, key: &MergeKey) -> Option<&'c Entity> {
		let slot = self
			.slots
			.iter_mut()
			.find(|slot| !slot.taken && slot.key.as_ref() == Some(key))?;
		slot.taken = true;
		Some(slot.entity)
	}

	/// Append the entities nothing matched, each after its leading trivia.
	fn drain_into(self, output: &mut Vec<Entity>, include_trailing: bool) {
		for slot in self.slots.into_iter().filter(|slot| !slot.taken) {
			tracing::debug!("adding new {}", describe(slot.entity));
			output.extend(slot.leading.into_iter().cloned());
			output.push(slot.entity.clone());
		}

		if include_trailing {
			output.extend(self.trailing.into_iter().cloned());
		}
	}
}

fn describe(entity: &Entity) -> String {
	merge_key(entity).map_or_else(|| entity.name_or_empty().to_string(), |key| key.to_string())
}

/// Merge a generated `candidate` tree into the `previous` tree.
///
/// The result follows the order of `previous`. Matched entities take their
/// declaration from the candidate and keep the annotations, code blocks,
/// ignore and force flags and C signatures of the previous entity. Previous
/// entities without a match are dropped unless forced; comments, directives
/// and standalone code blocks are kept where they were. Candidates without a
/// match are appended after the kept entities.
pub fn merge(previous: &Scope, candidate: &Scope) -> Scope {
	Scope::from(merge_scopes(previous, candidate))
}

fn merge_scopes(previous: &Scope, candidate: &Scope) -> Vec<Entity> {
	let mut pools = vec![Pool::new(candidate)];
	let mut output = merge_entities(previous, &mut pools);

	if let Some(pool) = pools.pop() {
		pool.drain_into(&mut output, previous.is_empty());
	}

	output
}

/// Merge the entities of a previous scope against a stack of candidate
/// pools, searching the innermost pool first.
fn merge_entities<'c>(previous: &Scope, pools: &mut Vec<Pool<'c>>) -> Vec<Entity> {
	let mut output = vec![];

	for entity in previous.iter() {
		if entity.is_trivia() {
			output.push(entity.clone());
			continue;
		}

		if let EntityKind::Conditional(conditional) = &entity.kind {
			output.push(merge_conditional(entity, conditional, pools));
			continue;
		}

		let matched = merge_key(entity).and_then(|key| {
			pools
				.iter_mut()
				.rev()
				.find_map(|pool| pool.take(&key))
		});

		match matched {
			Some(candidate) => output.push(merge_entity(entity, candidate)),
			None if entity.force => output.push(entity.clone()),
			None => tracing::debug!("dropping stale {}", describe(entity)),
		}
	}

	output
}

fn merge_conditional<'c>(
	entity: &Entity,
	conditional: &Conditional,
	pools: &mut Vec<Pool<'c>>,
) -> Entity {
	let candidate = merge_key(entity).and_then(|key| pools.last_mut().and_then(|pool| pool.take(&key)));

	let (pool, candidate_blocks) = match candidate {
		Some(Entity {
			kind: EntityKind::Conditional(inner),
			blocks,
			..
		}) => (Pool::new(&inner.scope), blocks.as_slice()),
		_ => (Pool::default(), [].as_slice()),
	};

	pools.push(pool);
	let mut scope = merge_entities(&conditional.scope, pools);
	if let Some(pool) = pools.pop() {
		pool.drain_into(&mut scope, conditional.scope.is_empty());
	}

	let mut merged = entity.clone();
	merged.kind = EntityKind::Conditional(Conditional {
		expression: conditional.expression.clone(),
		scope: Scope::from(scope),
	});
	merged.blocks = merge_blocks(&entity.blocks, candidate_blocks);
	merged
}

/// The candidate entity carrying everything the previous one accumulated.
fn merge_entity(previous: &Entity, candidate: &Entity) -> Entity {
	let mut merged = candidate.clone();
	merged.annotations = merge_annotations(&previous.annotations, &candidate.annotations);
	merged.blocks = merge_blocks(&previous.blocks, &candidate.blocks);
	merged.ignore = previous.ignore;
	merged.force = previous.force;
	merged.trailing_comment.clone_from(&previous.trailing_comment);

	match (&mut merged.kind, &previous.kind) {
		(EntityKind::Function(function), EntityKind::Function(old)) => {
			if old.c_signature.is_some() {
				function.c_signature.clone_from(&old.c_signature);
			}
			merge_arguments(&mut function.arguments, &old.arguments);
		}
		(EntityKind::Enum(value), EntityKind::Enum(old)) => {
			let (enumerators, mut closing) = merge_enumerators(&old.enumerators, &value.enumerators);
			closing.extend(old.closing_comments.iter().cloned());
			value.enumerators = enumerators;
			value.closing_comments = closing;
		}
		(EntityKind::Namespace(scope), EntityKind::Namespace(old)) => {
			*scope = Scope::from(merge_scopes(old, scope));
		}
		(EntityKind::Class(class), EntityKind::Class(old)) => {
			class.scope = Scope::from(merge_scopes(&old.scope, &class.scope));
		}
		(EntityKind::Typedef(typedef), EntityKind::Typedef(old)) => {
			if let (Some(scope), Some(old)) = (typedef.scope.as_mut(), old.scope.as_ref()) {
				*scope = Scope::from(merge_scopes(old, scope));
			}
		}
		_ => {}
	}

	merged
}

fn merge_annotations(previous: &Annotations, candidate: &Annotations) -> Annotations {
	let mut merged = previous.clone();
	merged.union(candidate);
	merged
}

/// Previous blocks win; candidate blocks are added when no previous block
/// has the same name.
fn merge_blocks(previous: &[CodeBlock], candidate: &[CodeBlock]) -> Vec<CodeBlock> {
	let mut merged = previous.to_vec();
	for block in candidate {
		if !previous.iter().any(|old| old.name == block.name) {
			merged.push(block.clone());
		}
	}
	merged
}

/// Enumerators in previous order with their markers and comments, then the
/// new ones. Also returns the comments of dropped enumerators that no later
/// enumerator could take.
fn merge_enumerators(previous: &[Enumerator], candidate: &[Enumerator]) -> (Vec<Enumerator>, Vec<Comment>) {
	let mut merged = vec![];
	let mut orphaned: Vec<Comment> = vec![];

	for old in previous {
		let mut kept = match candidate.iter().find(|enumerator| enumerator.name == old.name) {
			Some(enumerator) => {
				let mut enumerator = enumerator.clone();
				enumerator.annotations = merge_annotations(&old.annotations, &enumerator.annotations);
				enumerator.ignore = old.ignore;
				enumerator.force = old.force;
				enumerator.trailing_comment.clone_from(&old.trailing_comment);
				enumerator
			}
			None if old.force => old.clone(),
			None => {
				tracing::debug!("dropping stale enumerator {}", old.name);
				orphaned.extend(old.comments.iter().cloned());
				continue;
			}
		};

		kept.comments = orphaned.drain(..).chain(old.comments.iter().cloned()).collect();
		merged.push(kept);
	}

	for enumerator in candidate {
		if !previous.iter().any(|old| old.name == enumerator.name) {
			tracing::debug!("adding new enumerator {}", enumerator.name);
			merged.push(enumerator.clone());
		}
	}

	(merged, orphaned)
}

fn argument_key(argument: &Argument, index: usize) -> String {
	argument
		.name
		.clone()
		.unwrap_or_else(|| format!("arg{index}"))
}

fn merge_arguments(arguments: &mut [Argument], previous: &[Argument]) {
	for (index, argument) in arguments.iter_mut().enumerate() {
		let key = argument_key(argument, index);
		let old = previous
			.iter()
			.enumerate()
			.find(|(old_index, old)| argument_key(old, *old_index) == key);

		if let Some((_, old)) = old {
			argument.annotations = merge_annotations(&old.annotations, &argument.annotations);
		}
	}
}
