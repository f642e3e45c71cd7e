//! Source-text front end for the gitmem language.
//!
//! [`parse`] turns a program into the [`gitmem_core`] statement tree
//! consumed by the interpreter. Parsing also performs the two static
//! duties the runtime relies on: `if`/`else` is lowered to forward
//! conditional jumps (the core AST has no structured branching), and every
//! register use is checked to be preceded by an assignment in an enclosing
//! block.
//!
//! # Example
//!
//! ```rust
//! let program = gitmem_lang::parse("$t = spawn { x = 1; }; join $t; assert x == 1;").unwrap();
//! assert_eq!(program.len(), 3);
//! ```

#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod lexer;
mod parser;

use thiserror::Error;

pub use parser::parse;

/// A syntax or static-semantics error, positioned at a source line and
/// column (both 1-based).
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    #[error("{line}:{col}: unexpected character {found:?}")]
    UnexpectedChar { line: u32, col: u32, found: char },

    #[error("{line}:{col}: integer literal out of range")]
    IntegerOutOfRange { line: u32, col: u32 },

    #[error("{line}:{col}: unexpected {found}, expected {expected}")]
    Unexpected {
        line: u32,
        col: u32,
        found: String,
        expected: String,
    },

    #[error("{line}:{col}: register ${name} has not been assigned")]
    UnassignedRegister { line: u32, col: u32, name: String },

    #[error("{line}:{col}: invalid condition")]
    InvalidCondition { line: u32, col: u32 },

    #[error("{line}:{col}: invalid thread identifier")]
    InvalidJoinTarget { line: u32, col: u32 },

    #[error("{line}:{col}: invalid right-hand side to assignment")]
    InvalidAssignRhs { line: u32, col: u32 },
}
