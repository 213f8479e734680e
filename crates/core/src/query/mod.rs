//! The query language: S-expression parser and SQL translator.
//!
//! ```
//! use orgdex_core::query::{Translator, parse};
//!
//! let done = vec!["DONE".to_string()];
//! let node = parse(r#"(and (todo "TODO") (tag "work"))"#).unwrap();
//! let compiled = Translator::new(&done).translate(&node).unwrap();
//! assert!(compiled.where_clause.contains("h.todo_state IN"));
//! ```

pub mod parser;
pub mod translator;

pub use parser::{ParseError, QueryNode, parse};
pub use translator::{CompiledQuery, SqlParam, TranslateError, Translator};
