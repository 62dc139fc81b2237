use std::sync::Mutex;

use wallet_import_core::{ErrorReporterPort, ImportError, PortError};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorReporter;

impl ErrorReporterPort for TracingErrorReporter {
    fn add_error(&self, message: &str, cause: &ImportError) {
        tracing::error!(key = message, %cause, "import error reported");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub message: String,
    pub cause: String,
}

/// Keeps reports for the caller to render or inspect.
#[derive(Debug, Default)]
pub struct RecordingErrorReporter {
    reports: Mutex<Vec<ErrorReport>>,
}

impl RecordingErrorReporter {
    pub fn reports(&self) -> Result<Vec<ErrorReport>, PortError> {
        self.reports
            .lock()
            .map(|g| g.clone())
            .map_err(|e| PortError::Storage(format!("reporter lock poisoned: {e}")))
    }
}

impl ErrorReporterPort for RecordingErrorReporter {
    fn add_error(&self, message: &str, cause: &ImportError) {
        let report = ErrorReport {
            message: message.to_owned(),
            cause: cause.to_string(),
        };
        match self.reports.lock() {
            Ok(mut g) => g.push(report),
            Err(poisoned) => poisoned.into_inner().push(report),
        }
    }
}
