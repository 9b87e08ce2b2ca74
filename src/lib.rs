pub mod ast;
pub mod error;
pub mod eval;
pub mod lex;
pub mod parse;
pub mod scope;
pub mod span;
pub mod system;
pub mod value;

pub use error::{Error, ErrorKind};
pub use eval::{Interpreter, is_source_file};
pub use lex::{Lexer, Token, TokenKind};
pub use parse::Parser;
pub use value::Value;

/// Lexes, parses and evaluates `source_text` with a fresh interpreter bound
/// to the process's stdin and stdout.
///
/// Files with a language extension must define `main`, and its return value
/// is the result. Anything else yields the list of top-level values.
pub fn run(source_name: &str, source_text: &str) -> Result<Value, Error> {
    Interpreter::new().run(source_name, source_text)
}
