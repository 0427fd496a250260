//! Generate `%ConvertToSubClassCode` that maps a pointer to the most derived
//! wrapped class.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use crate::model::CodeBlock;
use crate::model::Entity;
use crate::model::EntityKind;
use crate::model::Scope;
use crate::model::qualify;

pub const DISPATCH_BLOCK: &str = "ConvertToSubClassCode";
const HEADER_BLOCK: &str = "TypeHeaderCode";
const INDENT: &str = "    ";

#[derive(Debug, Clone)]
pub struct DispatchOptions {
	pub enabled: bool,
	/// Classes that get no type test of their own. Their subclasses are
	/// still tested.
	pub exclude: HashSet<String>,
	pub include_prefix: String,
}

impl Default for DispatchOptions {
	fn default() -> Self {
		Self {
			enabled: true,
			exclude: HashSet::new(),
			include_prefix: String::new(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchNode {
	/// The qualified class name.
	pub class: String,
	pub sip_type: String,
	pub excluded: bool,
	pub children: Vec<DispatchNode>,
}

impl DispatchNode {
	fn render(&self, output: &mut String, depth: usize) {
		if self.excluded {
			for child in &self.children {
				child.render(output, depth);
			}
			return;
		}

		let indent = INDENT.repeat(depth);
		output.push_str(&format!(
			"{indent}if (dynamic_cast<{} *>(sipCpp) != nullptr)\n",
			self.class
		));
		output.push_str(&format!("{indent}{{\n"));
		output.push_str(&format!("{indent}{INDENT}sipType = {};\n", self.sip_type));
		for child in &self.children {
			child.render(output, depth + 1);
		}
		output.push_str(&format!("{indent}}}\n"));
	}

	fn most_derived<'n>(&'n self, is_instance: &impl Fn(&str) -> bool, found: &mut Option<&'n str>) {
		if !self.excluded {
			if !is_instance(&self.class) {
				return;
			}
			*found = Some(&self.class);
		}

		for child in &self.children {
			child.most_derived(is_instance, found);
		}
	}

	fn classes<'n>(&'n self, output: &mut Vec<&'n str>) {
		output.push(&self.class);
		for child in &self.children {
			child.classes(output);
		}
	}
}

/// The dispatch code for one inheritance root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchTree {
	pub root: DispatchNode,
	/// `#include` targets of every class in the tree, sorted.
	pub includes: Vec<String>,
}

impl DispatchTree {
	/// The body of the `%ConvertToSubClassCode` block. Each nested test
	/// overwrites the assignment of the test enclosing it, so the most
	/// derived matching class wins.
	pub fn render(&self) -> String {
		let mut output = String::from("sipType = nullptr;\n");
		self.root.render(&mut output, 0);
		output
	}

	/// The class the rendered code assigns for an object, given which
	/// classes the object is an instance of.
	pub fn most_derived(&self, is_instance: impl Fn(&str) -> bool) -> Option<&str> {
		let mut found = None;
		self.root.most_derived(&is_instance, &mut found);
		found
	}

	pub fn classes(&self) -> Vec<&str> {
		let mut classes = vec![];
		self.root.classes(&mut classes);
		classes
	}
}

struct Candidate {
	class: String,
	bases: Vec<String>,
	header: PathBuf,
}

fn collect_classes(scope: &Scope, path: &[String], header: &Path, output: &mut Vec<Candidate>) {
	for entity in scope.iter().filter(|entity| entity.is_active()) {
		match &entity.kind {
			EntityKind::Conditional(conditional) => collect_classes(&conditional.scope, path, header, output),
			EntityKind::Namespace(inner) => {
				let Some(name) = &entity.name else {
					continue;
				};
				let mut nested = path.to_vec();
				nested.push(name.clone());
				collect_classes(inner, &nested, header, output);
			}
			EntityKind::Class(class) if !class.opaque => {
				let Some(name) = &entity.name else {
					continue;
				};
				output.push(Candidate {
					class: qualify(path, name),
					bases: class.bases.clone(),
					header: header.to_path_buf(),
				});
				let mut nested = path.to_vec();
				nested.push(name.clone());
				collect_classes(&class.scope, &nested, header, output);
			}
			_ => {}
		}
	}
}

fn sip_type(class: &str) -> String {
	format!("sipType_{}", class.replace("::", "_"))
}

fn strip_template_arguments(name: &str) -> &str {
	name.split('<').next().unwrap_or(name).trim()
}

/// Build one dispatch tree per inheritance root of the classes in
/// `headers`. The scopes are transformed trees, so base names are already
/// qualified. A class nests under its first base that is part of the set;
/// roots without subclasses produce no tree.
pub fn build_dispatch(headers: &[(&Path, &Scope)], options: &DispatchOptions) -> Vec<DispatchTree> {
	if !options.enabled {
		return vec![];
	}

	let mut candidates = vec![];
	for (header, scope) in headers {
		collect_classes(scope, &[], header, &mut candidates);
	}

	let known: HashSet<&str> = candidates.iter().map(|candidate| candidate.class.as_str()).collect();
	let mut warned = HashSet::new();
	let mut parents: HashMap<&str, &str> = HashMap::new();

	for candidate in &candidates {
		let mut parent = None;
		for base in &candidate.bases {
			let base = strip_template_arguments(base);
			if known.contains(base) {
				parent = Some(base);
				break;
			}
			if warned.insert(base.to_string()) {
				tracing::warn!(
					"base `{base}` of `{}` is not a wrapped class; skipping it for dispatch",
					candidate.class
				);
			}
		}
		if let Some(parent) = parent {
			parents.insert(&candidate.class, parent);
		}
	}

	let headers_by_class: HashMap<&str, &Path> = candidates
		.iter()
		.map(|candidate| (candidate.class.as_str(), candidate.header.as_path()))
		.collect();

	candidates
		.iter()
		.filter(|candidate| !parents.contains_key(candidate.class.as_str()))
		.filter_map(|root| {
			let node = build_node(&root.class, &candidates, &parents, options);
			if node.children.is_empty() {
				return None;
			}

			let tree = DispatchTree {
				includes: Vec::new(),
				root: node,
			};
			let includes: BTreeSet<String> = tree
				.classes()
				.into_iter()
				.filter_map(|class| headers_by_class.get(class))
				.filter_map(|header| header.file_name())
				.map(|name| format!("{}{}", options.include_prefix, name.to_string_lossy()))
				.collect();

			Some(DispatchTree {
				includes: includes.into_iter().collect(),
				..tree
			})
		})
		.collect()
}

fn build_node(
	class: &str,
	candidates: &[Candidate],
	parents: &HashMap<&str, &str>,
	options: &DispatchOptions,
) -> DispatchNode {
	let children = candidates
		.iter()
		.filter(|candidate| parents.get(candidate.class.as_str()) == Some(&class))
		.map(|candidate| build_node(&candidate.class, candidates, parents, options))
		.collect();

	let simple = class.rsplit("::").next().unwrap_or(class);
	DispatchNode {
		class: class.to_string(),
		sip_type: sip_type(class),
		excluded: options.exclude.contains(class) || options.exclude.contains(simple),
		children,
	}
}

fn find_class_mut<'s>(scope: &'s mut Scope, path: &[&str]) -> Option<&'s mut Entity> {
	let (first, rest) = path.split_first()?;

	for entity in scope.iter_mut() {
		if matches!(entity.kind, EntityKind::Conditional(_)) {
			if let EntityKind::Conditional(conditional) = &mut entity.kind {
				if let Some(found) = find_class_mut(&mut conditional.scope, path) {
					return Some(found);
				}
			}
			continue;
		}

		if entity.name.as_deref() != Some(*first) {
			continue;
		}

		if rest.is_empty() {
			if entity.as_class().is_some() {
				return Some(entity);
			}
			continue;
		}

		if let Some(inner) = entity.scope_mut() {
			if let Some(found) = find_class_mut(inner, rest) {
				return Some(found);
			}
		}
	}

	None
}

/// Attach each tree's dispatch code to its root class, replacing an
/// existing `%ConvertToSubClassCode` block, and add the includes the code
/// needs to the class's `%TypeHeaderCode`.
pub fn attach_dispatch(scopes: &mut [Scope], trees: &[DispatchTree]) {
	for tree in trees {
		let path: Vec<&str> = tree.root.class.split("::").collect();
		let Some(entity) = scopes.iter_mut().find_map(|scope| find_class_mut(scope, &path)) else {
			tracing::debug!("dispatch root `{}` is not part of any output", tree.root.class);
			continue;
		};

		let body = tree.render();
		match entity.blocks.iter_mut().find(|block| block.name == DISPATCH_BLOCK) {
			Some(block) => block.body = body,
			None => entity.blocks.push(CodeBlock::new(DISPATCH_BLOCK, body)),
		}

		let header_index = match entity.blocks.iter().position(|block| block.name == HEADER_BLOCK) {
			Some(index) => index,
			None => {
				entity.blocks.insert(0, CodeBlock::new(HEADER_BLOCK, String::new()));
				0
			}
		};
		let header = &mut entity.blocks[header_index];
		for include in &tree.includes {
			let line = format!("#include <{include}>");
			if !header.body.lines().any(|existing| existing.trim() == line) {
				header.body.push_str(&line);
				header.body.push('\n');
			}
		}
	}
}
