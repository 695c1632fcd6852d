//! Hosts: the seam between the harness and the runtime under test
//!
//! A [`Host`] turns a composed [`Program`] into a running [`Execution`]
//! that reports what happens as a stream of [`HostEvent`]s. The sandbox
//! owns the clock; hosts only launch, report, and stop when told to.

use crate::discovery;
use crate::prelude::Program;
use crate::protocol::{self, Signal};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use thiserror::Error;

/// How often the process waiter checks for exit
const WAIT_INTERVAL: Duration = Duration::from_millis(5);

/// Which output stream a line came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    /// Standard output
    Stdout,
    /// Standard error
    Stderr,
}

/// How an execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    /// Exited with a status code
    Code(i32),
    /// Killed by a signal or otherwise torn down abnormally
    Terminated,
}

impl ExitState {
    /// Check for a clean exit
    pub fn is_success(&self) -> bool {
        matches!(self, ExitState::Code(0))
    }
}

impl From<ExitStatus> for ExitState {
    fn from(status: ExitStatus) -> Self {
        status
            .code()
            .map(ExitState::Code)
            .unwrap_or(ExitState::Terminated)
    }
}

/// Something observed while a program runs
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// Plain output
    Line(Stream, String),
    /// A protocol signal
    Signal(Signal),
    /// The execution is over; always the last event a host sends
    Exited(ExitState),
}

/// A host failed before the program could run
#[derive(Debug, Error)]
pub enum HostError {
    /// The scratch directory could not be prepared
    #[error("failed to prepare scratch directory: {0}")]
    Scratch(#[source] std::io::Error),
    /// The engine command could not be started
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        /// Command that was run
        command: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// A supervising thread could not be started
    #[error("failed to start host thread: {0}")]
    Thread(#[source] std::io::Error),
    /// The native host has no body registered under this id
    #[error("no native test body registered for `{0}`")]
    UnknownTest(String),
}

/// A runtime that can run composed programs
pub trait Host: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Start `program` in fresh state
    fn launch(&self, program: &Program) -> Result<Box<dyn Execution>, HostError>;
}

/// A running program
pub trait Execution: Send {
    /// Events produced by the program, ending with [`HostEvent::Exited`]
    fn events(&self) -> &Receiver<HostEvent>;

    /// Stop the program; safe to call more than once
    fn terminate(&mut self);
}

/// Runs each program in a fresh engine process
///
/// The source is written to `test.js` (or `test.mjs` for modules) in a new
/// scratch directory, which is also the working directory of the process.
/// `*_FIXTURE` files from the test's own directory are copied alongside, so
/// relative imports resolve as they would next to the original file.
/// The command line is `command args [module_args] host_args file`.
#[derive(Debug, Clone)]
pub struct ProcessHost {
    command: String,
    args: Vec<String>,
    module_args: Vec<String>,
}

impl ProcessHost {
    /// Host running `command`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            module_args: Vec::new(),
        }
    }

    /// Arguments passed before the test file on every run
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Extra arguments for module tests
    pub fn with_module_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.module_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The engine command
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Arguments passed on every run
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Arguments passed for module tests
    pub fn module_args(&self) -> &[String] {
        &self.module_args
    }

    fn build_command(&self, program: &Program, file: &Path, cwd: &Path) -> Command {
        let mut command = Command::new(&self.command);
        command.args(&self.args);
        if program.module {
            command.args(&self.module_args);
        }
        command
            .args(&program.host_args)
            .arg(file)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}

impl Host for ProcessHost {
    fn name(&self) -> &str {
        &self.command
    }

    fn launch(&self, program: &Program) -> Result<Box<dyn Execution>, HostError> {
        let scratch = tempfile::Builder::new()
            .prefix("conformance-")
            .tempdir()
            .map_err(HostError::Scratch)?;
        let file = scratch
            .path()
            .join(if program.module { "test.mjs" } else { "test.js" });
        std::fs::write(&file, &program.source).map_err(HostError::Scratch)?;
        if let Some(origin) = &program.origin {
            stage_fixtures(origin, scratch.path()).map_err(HostError::Scratch)?;
        }

        let mut child = self
            .build_command(program, &file, scratch.path())
            .spawn()
            .map_err(|source| HostError::Spawn {
                command: self.command.clone(),
                source,
            })?;
        tracing::debug!(test = %program.test_id, pid = child.id(), "spawned host process");

        let (tx, rx) = crossbeam_channel::unbounded();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, Stream::Stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, Stream::Stderr, tx.clone()));
        }

        let child = Arc::new(Mutex::new(child));
        let mut execution = ProcessExecution {
            child: Arc::clone(&child),
            events: rx,
            _scratch: scratch,
        };

        let readers = match readers.into_iter().collect::<Result<Vec<_>, _>>() {
            Ok(readers) => readers,
            Err(e) => {
                execution.terminate();
                return Err(HostError::Thread(e));
            }
        };

        let waiter = thread::Builder::new()
            .name("conformance-waiter".to_string())
            .spawn(move || {
                let state = wait_for_exit(&child);
                for reader in readers {
                    let _ = reader.join();
                }
                let _ = tx.send(HostEvent::Exited(state));
            });
        if let Err(e) = waiter {
            execution.terminate();
            return Err(HostError::Thread(e));
        }

        Ok(Box::new(execution))
    }
}

/// Copy the fixtures next to a test into `scratch`
fn stage_fixtures(origin: &Path, scratch: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(origin)? {
        let path = entry?.path();
        if !path.is_file() || !discovery::is_fixture_file(&path) {
            continue;
        }
        if let Some(name) = path.file_name() {
            std::fs::copy(&path, scratch.join(name))?;
        }
    }
    Ok(())
}

fn wait_for_exit(child: &Mutex<Child>) -> ExitState {
    loop {
        let status = child.lock().try_wait();
        match status {
            Ok(Some(status)) => return ExitState::from(status),
            Ok(None) => thread::sleep(WAIT_INTERVAL),
            Err(e) => {
                tracing::warn!(error = %e, "lost track of host process");
                return ExitState::Terminated;
            }
        }
    }
}

fn spawn_reader<R>(
    reader: R,
    stream: Stream,
    tx: Sender<HostEvent>,
) -> std::io::Result<thread::JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("conformance-reader".to_string())
        .spawn(move || {
            let mut reader = BufReader::new(reader);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&buf);
                        let line = text.trim_end_matches(['\n', '\r']);
                        let event = match protocol::decode_line(line) {
                            Some(signal) => HostEvent::Signal(signal),
                            None => HostEvent::Line(stream, line.to_string()),
                        };
                        if tx.send(event).is_err() {
                            break;
                        }
                    }
                }
            }
        })
}

struct ProcessExecution {
    child: Arc<Mutex<Child>>,
    events: Receiver<HostEvent>,
    _scratch: TempDir,
}

impl Execution for ProcessExecution {
    fn events(&self) -> &Receiver<HostEvent> {
        &self.events
    }

    fn terminate(&mut self) {
        let mut child = self.child.lock();
        if let Err(e) = child.kill() {
            tracing::debug!(error = %e, "host process already gone");
        }
    }
}

impl Drop for ProcessExecution {
    fn drop(&mut self) {
        self.terminate();
    }
}
