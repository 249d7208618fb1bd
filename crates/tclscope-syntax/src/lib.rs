//! # tclscope-syntax
//!
//! The syntax layer of tclscope: everything between raw Tcl source text and a
//! queryable [`Script`] tree.
//!
//! - **Source map**: [`SourceFile`] owns the text plus a newline index for
//!   O(log n) offset-to-position mapping.
//! - **Host adapter**: [`tokens`] exposes the classic word-level command
//!   tokeniser and list splitter the rest of the pipeline is written against.
//! - **Parser**: [`parse_script`] builds the command/word tree, recognising
//!   the closed set of structure-introducing commands (`proc`, `while`,
//!   `for`, `foreach`, `namespace eval`) and recursively parsing their
//!   literal body words.
//! - **Names**: [`QualifiedName`] implements the `::` path rules.
//! - **Cursor**: [`find_position`] maps an editor position to the innermost
//!   call/argument/word.
//!
//! Semantic indexing on top of these trees lives in `tclscope-index`.

#![deny(unsafe_code)]

pub mod cursor;
pub mod names;
pub mod script;
pub mod source;
pub mod tokens;

pub use cursor::{find_position, ScriptCursor};
pub use names::{path_segments, QualifiedName, DELIMITER};
pub use script::{parse_script, Call, CallKind, ParseContext, Script, Word, WordPayload};
pub use source::{LinePos, SourceFile, SourceLocation, Span};
pub use tokens::{parse_command, split_list, ParseError, ParsedCommand, Token, TokenKind};
