//! `sipweave_core` is the core library for [sipweave](https://github.com/ifiokjr/sipweave). It reads C++ headers, builds a declaration tree, turns it into SIP binding declarations and merges the result with the `.sip` file generated last time, so annotations, code blocks and other hand edits survive regeneration.
//!
//! ## Processing Pipeline
//!
//! ```text
//! header text
//!   → Preprocessor (line-count preserving #if / #define filtering)
//!   → Lexer (mode-switching tokenizer, function bodies become opaque blocks)
//!   → Parser (namespaces, classes, enums, typedefs, functions, variables)
//!   → Transformer (export filter, qualified names, annotation rules, %TypeHeaderCode)
//!   → Dispatch (%ConvertToSubClassCode for each inheritance root)
//!
//! existing .sip text
//!   → SIP lexer + parser (same entity model, comments and code blocks kept)
//!
//! (previous tree, candidate tree) → Merge → SIP writer → .sip text
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading from `sipweave.toml`: module name and output directory, excluded headers, preprocessor values, configured macros, transform rules and dispatch options.
//! - [`tokens`]: The token type shared by the header and SIP tokenizers.
//!
//! ## Key Types
//!
//! - [`Scope`] and [`Entity`]: The declaration tree both parsers produce and the writer serializes.
//! - [`PreprocessorContext`]: All state of one preprocessing run.
//! - [`SymbolIndex`]: Qualified names declared across every header of a run.
//! - [`DispatchTree`]: The subclass dispatch code for one inheritance root.
//! - [`GenerationContext`]: A project root with its configuration and headers, ready for generation.
//! - [`GenerateResult`]: Every file a run produces, with its previous content.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! use sipweave_core::GenerationContext;
//! use sipweave_core::generate;
//! use sipweave_core::write_updates;
//!
//! let ctx = GenerationContext::load(Path::new("."), &[]).unwrap();
//! let result = generate(&ctx).unwrap();
//!
//! if !result.is_up_to_date() {
//! 	eprintln!("{} file(s) out of date", result.changed().count());
//! }
//!
//! write_updates(&result).unwrap();
//! ```

pub use config::*;
pub use dispatch::*;
pub use engine::*;
pub use error::*;
pub use expression::*;
pub use lexer::*;
pub use merge::*;
pub use model::*;
pub use parser::*;
pub use preprocessor::*;
pub use sip_lexer::*;
pub use sip_parser::*;
pub use sip_writer::*;
pub use transform::*;

pub mod config;
pub(crate) mod cursor;
mod dispatch;
mod engine;
#[allow(unused_assignments)]
mod error;
mod expression;
mod lexer;
mod merge;
mod model;
mod parser;
mod preprocessor;
mod sip_lexer;
mod sip_parser;
mod sip_writer;
pub mod tokens;
mod transform;

#[cfg(test)]
mod __fixtures;
#[cfg(test)]
mod __tests;
