use std::cell::RefCell;
use std::rc::Rc;

use tracing::{info, warn};

/// Receives non-fatal findings from the table model.
pub trait Diagnostics {
    fn warn(&mut self, message: &str);
    fn info(&mut self, message: &str);
}

/// Forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&mut self, message: &str) {
        warn!("{message}");
    }

    fn info(&mut self, message: &str) {
        info!("{message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Warning(String),
    Info(String),
}

impl Diagnostic {
    pub fn message(&self) -> &str {
        match self {
            Diagnostic::Warning(m) | Diagnostic::Info(m) => m,
        }
    }
}

/// Keeps every message (and still forwards it to `tracing`). Clones share the
/// same buffer, so a handle can be kept after handing one to the model.
#[derive(Debug, Default, Clone)]
pub struct CollectedDiagnostics {
    messages: Rc<RefCell<Vec<Diagnostic>>>,
}

impl CollectedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Diagnostic> {
        self.messages.borrow().clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages
            .borrow()
            .iter()
            .filter_map(|d| match d {
                Diagnostic::Warning(m) => Some(m.clone()),
                Diagnostic::Info(_) => None,
            })
            .collect()
    }

    pub fn last(&self) -> Option<Diagnostic> {
        self.messages.borrow().last().cloned()
    }
}

impl Diagnostics for CollectedDiagnostics {
    fn warn(&mut self, message: &str) {
        TracingDiagnostics.warn(message);
        self.messages
            .borrow_mut()
            .push(Diagnostic::Warning(message.to_string()));
    }

    fn info(&mut self, message: &str) {
        TracingDiagnostics.info(message);
        self.messages
            .borrow_mut()
            .push(Diagnostic::Info(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_messages() {
        let handle = CollectedDiagnostics::new();
        let mut sink = handle.clone();
        sink.info("Sorting by price");
        sink.warn("Ignoring field 'c'");
        assert_eq!(handle.messages().len(), 2);
        assert_eq!(handle.warnings(), vec!["Ignoring field 'c'".to_string()]);
        assert_eq!(
            handle.last().map(|d| d.message().to_string()).as_deref(),
            Some("Ignoring field 'c'")
        );
    }
}
