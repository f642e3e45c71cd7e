//! Interpreter runtime for the gitmem language.
//!
//! A gitmem program runs threads against *versioned* global memory: there
//! is no shared store, and every thread and lock keeps its own view of the
//! globals together with an append-only history of the writes it has
//! observed. Synchronising statements (`join`, `lock`, `unlock`) reconcile
//! two views the way git reconciles branches: fast-forward when one
//! history is a prefix of the other, data race otherwise.
//!
//! This crate owns one execution: the [`GlobalContext`] (threads, locks,
//! commit counter and event graph), the thread interpreter
//! ([`progress_thread`]) that advances a chosen thread to its next sync
//! point, the fair sequential driver ([`run_threads`]), and two textual
//! renderers for the per-execution event graph. Schedule exploration lives
//! in the `gitmem_verifier` crate.
//!
//! # Example
//!
//! ```rust
//! let program = gitmem_lang::parse("x = 1; $t = spawn { $a = x; }; join $t;").unwrap();
//! let mut gctx = gitmem::GlobalContext::new(program);
//! let faulted = gitmem::run_threads(&mut gctx);
//! assert!(!faulted);
//! println!("{}", gitmem::graphviz::render(&gctx));
//! ```

#![deny(unused_must_use)]
#![warn(rust_2018_idioms, unreachable_pub)]

mod context;
mod driver;
pub mod graph;
mod interp;

pub mod graphviz;
pub mod mermaid;

pub use context::GlobalContext;

pub use context::Lock;

pub use context::Thread;

pub use driver::run_threads;

pub use interp::progress_thread;
