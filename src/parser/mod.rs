//! Parser for the template corpus format

pub mod ast;
mod grammar;
pub mod lexer;
pub mod pattern;

pub use ast::*;
pub use grammar::parse;
pub use pattern::parse_pattern;
