//! In-process host for test bodies written in Rust
//!
//! A body is a closure over a [`TestContext`]. Every launch builds a new
//! [`Realm`] and runs the body on its own thread, so nothing a body does is
//! visible to the next execution. Bodies report failures by returning
//! them; `?` on any assertion ends the body at the first failure.

use crate::assertion::AssertionFailure;
use crate::host::{Execution, ExitState, Host, HostError, HostEvent, Stream};
use crate::prelude::Program;
use crate::protocol::{self, Signal};
use crate::realm::Realm;
use core_types::ThrownError;
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Why a native body stopped early
#[derive(Debug, Clone, PartialEq)]
pub enum Thrown {
    /// An assertion failed
    Assertion(AssertionFailure),
    /// The subject raised an error the body did not handle
    Error(ThrownError),
}

impl From<AssertionFailure> for Thrown {
    fn from(failure: AssertionFailure) -> Self {
        Thrown::Assertion(failure)
    }
}

impl From<ThrownError> for Thrown {
    fn from(error: ThrownError) -> Self {
        Thrown::Error(error)
    }
}

/// Result of a native body
pub type BodyResult = Result<(), Thrown>;

/// A registered native test body
pub type NativeBody = Arc<dyn Fn(&mut TestContext) -> BodyResult + Send + Sync>;

/// Signals completion of an async native test from any thread
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    events: Sender<HostEvent>,
}

impl CompletionHandle {
    /// `$DONE()`
    pub fn done(&self) {
        let _ = self.events.send(HostEvent::Signal(Signal::AsyncComplete));
    }

    /// `$DONE(error)`
    pub fn fail(&self, message: impl Into<String>) {
        let _ = self
            .events
            .send(HostEvent::Signal(Signal::AsyncFailure(message.into())));
    }
}

/// Everything a native body may touch
pub struct TestContext {
    test_id: String,
    strict: bool,
    realm: Realm,
    events: Sender<HostEvent>,
    abandoned: Arc<AtomicBool>,
}

impl TestContext {
    /// Identity of the running test
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    /// Whether the test runs in strict mode
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// The realm of this execution
    pub fn realm(&self) -> &Realm {
        &self.realm
    }

    /// Mutable access to the realm of this execution
    pub fn realm_mut(&mut self) -> &mut Realm {
        &mut self.realm
    }

    /// Print a line to the execution's output
    pub fn print(&self, line: impl Into<String>) {
        let line = line.into();
        let event = match protocol::decode_line(&line) {
            Some(signal) => HostEvent::Signal(signal),
            None => HostEvent::Line(Stream::Stdout, line),
        };
        let _ = self.events.send(event);
    }

    /// Signal async completion
    pub fn done(&self) {
        self.completion().done();
    }

    /// Signal async failure
    pub fn done_with_error(&self, message: impl Into<String>) {
        self.completion().fail(message);
    }

    /// A handle for signalling completion from another thread
    pub fn completion(&self) -> CompletionHandle {
        CompletionHandle {
            events: self.events.clone(),
        }
    }

    /// True once the sandbox has given up on this execution
    pub fn is_abandoned(&self) -> bool {
        self.abandoned.load(Ordering::Acquire)
    }
}

/// Host running registered Rust bodies against a fresh [`Realm`]
///
/// Bodies are looked up by test id. A body that panics is reported as a
/// crash of the execution, not of the harness.
#[derive(Clone, Default)]
pub struct NativeHost {
    bodies: HashMap<String, NativeBody>,
}

impl NativeHost {
    /// Host with no bodies
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a body under `id`
    pub fn register<F>(&mut self, id: impl Into<String>, body: F)
    where
        F: Fn(&mut TestContext) -> BodyResult + Send + Sync + 'static,
    {
        self.bodies.insert(id.into(), Arc::new(body));
    }

    /// Builder form of [`register`](Self::register)
    pub fn with<F>(mut self, id: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut TestContext) -> BodyResult + Send + Sync + 'static,
    {
        self.register(id, body);
        self
    }

    /// Whether a body is registered under `id`
    pub fn contains(&self, id: &str) -> bool {
        self.bodies.contains_key(id)
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.bodies.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for NativeHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHost")
            .field("bodies", &self.ids())
            .finish()
    }
}

impl Host for NativeHost {
    fn name(&self) -> &str {
        "native"
    }

    fn launch(&self, program: &Program) -> Result<Box<dyn Execution>, HostError> {
        let body = self
            .bodies
            .get(&program.test_id)
            .cloned()
            .ok_or_else(|| HostError::UnknownTest(program.test_id.clone()))?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let abandoned = Arc::new(AtomicBool::new(false));
        let mut context = TestContext {
            test_id: program.test_id.clone(),
            strict: program.strict,
            realm: Realm::new(),
            events: tx.clone(),
            abandoned: Arc::clone(&abandoned),
        };

        thread::Builder::new()
            .name(format!("native-{}", program.test_id))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut context)));
                drop(context);
                let events = match outcome {
                    Ok(Ok(())) => vec![HostEvent::Exited(ExitState::Code(0))],
                    Ok(Err(Thrown::Assertion(failure))) => vec![
                        HostEvent::Signal(Signal::Failure(failure)),
                        HostEvent::Exited(ExitState::Code(1)),
                    ],
                    Ok(Err(Thrown::Error(error))) => vec![
                        HostEvent::Signal(Signal::Uncaught(error)),
                        HostEvent::Exited(ExitState::Code(1)),
                    ],
                    Err(payload) => vec![
                        HostEvent::Line(Stream::Stderr, panic_message(payload.as_ref())),
                        HostEvent::Exited(ExitState::Terminated),
                    ],
                };
                for event in events {
                    let _ = tx.send(event);
                }
            })
            .map_err(HostError::Thread)?;

        Ok(Box::new(NativeExecution {
            events: rx,
            abandoned,
        }))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("body panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("body panicked: {}", s)
    } else {
        "body panicked".to_string()
    }
}

struct NativeExecution {
    events: Receiver<HostEvent>,
    abandoned: Arc<AtomicBool>,
}

impl Execution for NativeExecution {
    fn events(&self) -> &Receiver<HostEvent> {
        &self.events
    }

    fn terminate(&mut self) {
        // Threads cannot be killed; the body sees the flag if it polls.
        self.abandoned.store(true, Ordering::Release);
    }
}
