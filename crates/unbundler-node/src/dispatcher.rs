use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{trace, warn};
use unbundler_codec::{Argument, Message};

use crate::pattern::{parse_pattern, AddressMatcher, PatternError};

/// Failure raised by one registered handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(reason: impl fmt::Display) -> Self {
        HandlerError::Failed(reason.to_string())
    }
}

/// Handler invoked with the message address and its ordered arguments.
pub type HandlerFn = dyn Fn(&str, &[Argument]) -> Result<(), HandlerError> + Send + Sync;

#[derive(Clone)]
struct Registration {
    matcher: Arc<dyn AddressMatcher>,
    handler: Arc<HandlerFn>,
}

/// One isolated handler failure from a dispatch pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    pub pattern: String,
    pub error: HandlerError,
}

/// Outcome of routing one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers whose pattern matched (including ones that failed).
    pub matched: usize,
    pub failures: Vec<HandlerFailure>,
}

/// Ordered (pattern, handler) table.
///
/// Dispatch runs against a snapshot of the table, so registrations added or
/// removed while handlers run take effect from the next message on.
pub struct Dispatcher {
    table: RwLock<Arc<[Registration]>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            table: RwLock::new(Arc::from(Vec::new())),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("patterns", &self.patterns())
            .finish()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a registration after all existing ones.
    pub fn add_pattern<M, F>(&self, matcher: M, handler: F)
    where
        M: AddressMatcher + 'static,
        F: Fn(&str, &[Argument]) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.push(Registration {
            matcher: Arc::new(matcher),
            handler: Arc::new(handler),
        });
    }

    /// Parses `pattern` (glob or exact) and appends a registration.
    pub fn add_pattern_str<F>(&self, pattern: &str, handler: F) -> Result<(), PatternError>
    where
        F: Fn(&str, &[Argument]) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let matcher = parse_pattern(pattern)?;
        self.push(Registration {
            matcher: Arc::from(matcher),
            handler: Arc::new(handler),
        });
        Ok(())
    }

    /// Removes every registration whose pattern text equals `pattern`.
    ///
    /// Returns the number of registrations removed.
    pub fn remove_pattern(&self, pattern: &str) -> usize {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        let kept: Vec<Registration> = table
            .iter()
            .filter(|r| r.matcher.pattern() != pattern)
            .cloned()
            .collect();
        let removed = table.len() - kept.len();
        if removed > 0 {
            *table = Arc::from(kept);
        }
        removed
    }

    /// Registered pattern texts in registration order.
    pub fn patterns(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|r| r.matcher.pattern().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes every matching handler in registration order.
    ///
    /// A failing or panicking handler is recorded and the pass continues.
    pub fn dispatch(&self, message: &Message) -> DispatchReport {
        let table = self.snapshot();
        let mut report = DispatchReport::default();

        for registration in table.iter() {
            if !registration.matcher.matches(&message.address) {
                continue;
            }
            report.matched += 1;

            let handler = &registration.handler;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                handler(&message.address, &message.args)
            }))
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(&*payload))));

            if let Err(error) = outcome {
                let pattern = registration.matcher.pattern().to_string();
                warn!(
                    address = %message.address,
                    pattern = %pattern,
                    "handler error: {error}"
                );
                report.failures.push(HandlerFailure { pattern, error });
            }
        }

        trace!(
            address = %message.address,
            matched = report.matched,
            "dispatched message"
        );
        report
    }

    fn snapshot(&self) -> Arc<[Registration]> {
        Arc::clone(&self.table.read().unwrap_or_else(|e| e.into_inner()))
    }

    fn push(&self, registration: Registration) {
        let mut table = self.table.write().unwrap_or_else(|e| e.into_inner());
        let mut next = table.to_vec();
        next.push(registration);
        *table = Arc::from(next);
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
