//! Outcome delivery back to the caller of a create request.
//!
//! A responder outlives the request parsing step: it travels inside the
//! [`Operation`](crate::models::Operation) to whichever consumer executes it.
//! The terminal calls take `self: Box<Self>`, so a responder can only ever be
//! finished or failed once.

use crate::error::{AppError, Disposition, ErrorMetadata};

pub trait ClientResponder: Send + Sync {
    /// Append one line of output. May be called any number of times before
    /// the terminal call.
    fn add_line(&mut self, line: &str);

    /// Terminal: the request completed successfully.
    fn finish(self: Box<Self>);

    /// Terminal: the request failed with the given status code.
    fn error(self: Box<Self>, code: u16, message: &str);
}

/// Report `error` through `responder` according to its [`Disposition`].
///
/// This is the one place where an error kind turns into responder calls.
pub fn report_error(mut responder: Box<dyn ClientResponder>, error: &AppError) {
    match error.disposition() {
        Disposition::Soft => {
            responder.add_line(&error.client_message());
            if let Some(action) = error.suggested_action() {
                responder.add_line(action);
            }
            responder.finish();
        }
        Disposition::ClientError | Disposition::ServerError => {
            responder.error(error.http_status_code(), &error.client_message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default, PartialEq)]
    struct Recorded {
        lines: Vec<String>,
        finished: bool,
        error: Option<(u16, String)>,
    }

    struct Recorder(Arc<Mutex<Recorded>>);

    impl ClientResponder for Recorder {
        fn add_line(&mut self, line: &str) {
            self.0.lock().unwrap().lines.push(line.to_string());
        }

        fn finish(self: Box<Self>) {
            self.0.lock().unwrap().finished = true;
        }

        fn error(self: Box<Self>, code: u16, message: &str) {
            self.0.lock().unwrap().error = Some((code, message.to_string()));
        }
    }

    fn report(err: AppError) -> Recorded {
        let shared = Arc::new(Mutex::new(Recorded::default()));
        report_error(Box::new(Recorder(shared.clone())), &err);
        Arc::try_unwrap(shared).unwrap().into_inner().unwrap()
    }

    #[test]
    fn soft_failure_is_delivered_as_content() {
        let recorded = report(AppError::UnknownTemplateType("unknown-type".to_string()));
        assert!(recorded.finished);
        assert!(recorded.error.is_none());
        assert_eq!(recorded.lines.len(), 2);
        assert!(recorded.lines[0].contains("unknown-type"));
    }

    #[test]
    fn hard_failure_is_delivered_as_error() {
        let recorded = report(AppError::DuplicateIdentifier("message".to_string()));
        assert!(!recorded.finished);
        assert!(recorded.lines.is_empty());
        let (code, message) = recorded.error.unwrap();
        assert_eq!(code, 400);
        assert!(message.contains("message"));
    }
}
