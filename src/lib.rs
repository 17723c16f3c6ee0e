pub mod api;
pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod render;
pub mod utils;

pub use api::{parse, read_grammar, ParsedGrammar};
