//! The ldifsplit command-line tool.
//!
//! Wiring order: [`args`] defines the CLI surface, [`source`] assembles the
//! input byte stream, [`pipeline`] runs the parallel parse/translate stage,
//! [`dispatcher`] sinks translated entries into shard files, and [`runner`]
//! ties them together for one invocation.

pub mod args;
pub mod dispatcher;
pub mod pipeline;
pub mod runner;
pub mod source;

pub use args::Cli;
pub use dispatcher::{Dispatcher, RunSummary};
pub use runner::run;
