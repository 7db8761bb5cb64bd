//! Source frontend for the IBP workbench: tokenizer, parser and file loading.

/// Tokenizer with line/column tracking.
pub mod lexer;
/// Recursive-descent parser for programs.
pub mod parser;
/// Source loading and literate Markdown extraction.
pub mod source;

pub use parser::{parse, ParseError, ParseErrorKind, SourceLocation, MAX_NESTING};
pub use source::{extract_source, load, LoadError, LoadedProgram, SourceContent};
