//! Conformance Test Harness
//!
//! Runs test262-style conformance tests: discovers test files, parses
//! their metadata headers, gates them against what a host supports,
//! executes each one in fresh state with a wall-clock limit and reports one
//! classified result per test.
//!
//! The runtime under test is reached through the [`Host`] trait:
//! [`ProcessHost`] launches an external engine per test, [`NativeHost`]
//! runs Rust bodies against a fresh [`Realm`].

pub mod assertion;
pub mod config;
pub mod discovery;
pub mod error;
pub mod gate;
pub mod harness;
pub mod host;
pub mod native;
pub mod prelude;
pub mod protocol;
pub mod realm;
pub mod report;
pub mod sandbox;
pub mod test_file;

pub use assertion::{AssertResult, AssertionFailure, ExpectedDescriptor};
pub use config::{HarnessConfig, HostConfig};
pub use discovery::{discover, DiscoveredTest};
pub use error::{HarnessError, HarnessResult};
pub use gate::{Capabilities, GateDecision};
pub use harness::{ExecutionResult, FailReason, Harness, SkipReason, WorkItem};
pub use host::{Execution, ExitState, Host, HostError, HostEvent, ProcessHost, Stream};
pub use native::{BodyResult, CompletionHandle, NativeHost, TestContext, Thrown};
pub use prelude::{HelperError, HelperRegistry, Program};
pub use realm::Realm;
pub use report::{Progress, Reporter, RunReport, TestRecord};
pub use sandbox::{CancellationToken, Sandbox};
pub use test_file::{
    Flag, LoadError, MetadataError, NegativeExpectation, Phase, ReftestDirectives, TestCase,
    TestMetadata,
};

pub use core_types::{ErrorKind, ObjectId, PropertyDescriptor, ThrownError, Value};
