//! Stateless model checking for gitmem programs.
//!
//! The interpreter in the `gitmem` crate runs one schedule. This crate
//! explores *all* schedules that are distinguishable at sync-point
//! granularity, deduplicates the final states they reach, and classifies
//! each as passed, failing (a thread crashed), or deadlocked (live threads
//! that cannot advance).
//!
//! # Example
//!
//! ```rust
//! use gitmem_verifier::{Explorer, Verdict};
//!
//! // Whether the reader sees the write depends on who locks first.
//! let program = gitmem_lang::parse(
//!     "x = 0; \
//!      $t1 = spawn { lock l; x = 1; unlock l; }; \
//!      $t2 = spawn { lock l; $a = x; unlock l; assert $a == 1; }; \
//!      join $t1; join $t2;",
//! )
//! .unwrap();
//! let exploration = Explorer::new(program).run();
//! assert_eq!(exploration.states.len(), 2);
//! assert_eq!(exploration.failing().count(), 1);
//! ```

#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod explorer;
mod report;
mod trace_tree;
mod visitor;

pub use explorer::Exploration;

pub use explorer::Explorer;

pub use explorer::FinalState;

pub use explorer::Verdict;

pub use report::print_report;

pub use report::schedule_line;

pub use visitor::RecordingVisitor;

pub use visitor::Visitor;
