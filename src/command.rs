//! Typed command lines and their execution
//!
//! Stages never build shell strings. A stage produces an [`line::Invocation`]: one or more
//! argument vectors joined by pipes plus an optional stdout redirection. The executor spawns the
//! processes directly and reports an outcome.

/// Command lines, pipes and redirections
pub mod line;

/// Run invocations and classify their outcome
pub mod exec;
