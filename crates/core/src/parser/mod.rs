//! PDF syntax parsing.
//!
//! - `lexer`: byte scanner for individual tokens
//! - `value`: recursive value parser built on the lexer

pub mod lexer;
pub mod value;

pub use lexer::Lexer;
pub use value::{Parsed, get_value};
