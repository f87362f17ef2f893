use crate::autograd::cleanup::{CleanupReport, GraphCleaner};
use crate::autograd::variable::Variable;
use crate::error::Result;

/// Tracks the graph roots produced during one batch and tears them down when
/// the scope ends, whether it ends normally, through `?`, or by unwinding.
#[derive(Debug)]
pub struct BatchScope {
    label: String,
    roots: Vec<Variable>,
}

impl BatchScope {
    pub fn new(label: impl Into<String>) -> Self {
        BatchScope {
            label: label.into(),
            roots: Vec::new(),
        }
    }

    /// Registers `variable` for teardown and hands it back.
    pub fn track(&mut self, variable: Variable) -> Variable {
        self.roots.push(variable.clone());
        variable
    }

    pub fn tracked(&self) -> usize {
        self.roots.len()
    }

    /// Tears down all tracked graphs now.
    pub fn close(mut self) -> CleanupReport {
        self.release_all()
    }

    fn release_all(&mut self) -> CleanupReport {
        if self.roots.is_empty() {
            return CleanupReport::default();
        }
        let mut cleaner = GraphCleaner::new();
        for root in self.roots.drain(..) {
            cleaner.release(&root);
        }
        let report = cleaner.report();
        log::debug!(
            "batch scope '{}' closed: {} variables, {} buffers released",
            self.label,
            report.variables_visited,
            report.buffers_released
        );
        report
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        if std::thread::panicking() {
            log::warn!("batch scope '{}' unwinding, releasing {} roots", self.label, self.roots.len());
        }
        self.release_all();
    }
}

/// Runs `body` inside a fresh [`BatchScope`]; everything tracked is released
/// before this returns, including when `body` fails.
///
/// # Arguments
/// * `label` - Name used in the scope's log lines.
/// * `body` - Builds and consumes the batch graph, calling
///   [`BatchScope::track`] on the roots to release.
///
/// # Returns
/// Whatever `body` returns. Values extracted from tracked variables must be
/// copied out (for example with `item()`) before the scope closes.
pub fn with_scope<T, F>(label: &str, body: F) -> Result<T>
where
    F: FnOnce(&mut BatchScope) -> Result<T>,
{
    let mut scope = BatchScope::new(label);
    let out = body(&mut scope);
    if let Err(e) = &out {
        log::debug!("batch scope '{}' ended with error: {}", label, e);
    }
    drop(scope);
    out
}

#[cfg(test)]
#[path = "scope_test.rs"]
mod tests;
