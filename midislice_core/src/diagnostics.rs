//! Verbose tracing of a slicing run.

use std::fmt;

/// Receiver for step-by-step diagnostics emitted while slicing.
///
/// Components hold a sink instead of consulting a global verbosity switch,
/// so two runs in the same process can trace differently.
pub trait Diagnostics: fmt::Debug + Send + Sync {
    fn emit(&self, message: fmt::Arguments<'_>);
}

/// Discards every diagnostic.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Diagnostics for Silent {
    fn emit(&self, _message: fmt::Arguments<'_>) {}
}

/// Forwards diagnostics to the `log` facade at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn emit(&self, message: fmt::Arguments<'_>) {
        log::debug!(target: "midislice", "{message}");
    }
}
