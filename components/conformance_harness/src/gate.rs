//! Capability gating
//!
//! A test only runs when the host declares every feature and flag it
//! needs. The decision is made before anything is launched, so a missing
//! capability shows up as a clean skip instead of a spurious crash.

use crate::harness::SkipReason;
use crate::test_file::{Flag, TestCase};
use std::collections::HashSet;

/// Features assumed for a modern engine when nothing else is configured
pub const DEFAULT_FEATURES: &[&str] = &[
    "Symbol",
    "Symbol.species",
    "Symbol.iterator",
    "Symbol.toStringTag",
    "Symbol.toPrimitive",
    "Symbol.hasInstance",
    "Symbol.asyncIterator",
    "Map",
    "Set",
    "WeakMap",
    "WeakSet",
    "BigInt",
    "Proxy",
    "Reflect",
    "Reflect.construct",
    "Promise",
    "TypedArray",
    "ArrayBuffer",
    "DataView",
    "generators",
    "async-functions",
    "async-iteration",
    "WeakRef",
    "FinalizationRegistry",
    "arrow-function",
    "let",
    "const",
    "class",
    "template",
    "destructuring-binding",
    "destructuring-assignment",
    "default-parameters",
    "rest-parameters",
    "spread",
    "object-spread",
    "object-rest",
    "for-of",
    "computed-property-names",
    "optional-chaining",
    "coalesce-expression",
    "globalThis",
    "Atomics",
    "SharedArrayBuffer",
];

/// Flags a script-running host handles out of the box
pub const DEFAULT_FLAGS: &[Flag] = &[
    Flag::OnlyStrict,
    Flag::NoStrict,
    Flag::Raw,
    Flag::Async,
    Flag::Module,
    Flag::Generated,
    Flag::NonDeterministic,
    Flag::CanBlockIsTrue,
];

/// Outcome of gating a test
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Every requirement is met
    Runnable,
    /// At least one requirement is missing
    Skip(SkipReason),
}

impl GateDecision {
    /// Check if the test may run
    pub fn is_runnable(&self) -> bool {
        matches!(self, GateDecision::Runnable)
    }
}

/// Capability registry of a host: supported features and flags
///
/// Names the registry has never heard of count as unsupported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    features: HashSet<String>,
    flags: HashSet<Flag>,
}

impl Capabilities {
    /// Registry with the default feature and flag sets
    pub fn new() -> Self {
        Self {
            features: DEFAULT_FEATURES.iter().map(|f| f.to_string()).collect(),
            flags: DEFAULT_FLAGS.iter().cloned().collect(),
        }
    }

    /// Registry declaring nothing
    pub fn empty() -> Self {
        Self {
            features: HashSet::new(),
            flags: HashSet::new(),
        }
    }

    /// Registry with custom features and the default flags
    pub fn with_features<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            flags: DEFAULT_FLAGS.iter().cloned().collect(),
        }
    }

    /// Replace the supported flags
    pub fn with_flags<I: IntoIterator<Item = Flag>>(mut self, flags: I) -> Self {
        self.flags = flags.into_iter().collect();
        self
    }

    /// Add a supported feature
    pub fn enable_feature(&mut self, feature: &str) {
        self.features.insert(feature.to_string());
    }

    /// Remove a supported feature
    pub fn disable_feature(&mut self, feature: &str) {
        self.features.remove(feature);
    }

    /// Add a supported flag
    pub fn enable_flag(&mut self, flag: Flag) {
        self.flags.insert(flag);
    }

    /// Remove a supported flag
    pub fn disable_flag(&mut self, flag: &Flag) {
        self.flags.remove(flag);
    }

    /// Check a single feature
    pub fn supports_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Check a single flag
    pub fn supports_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }

    /// Get the set of supported features
    pub fn features(&self) -> &HashSet<String> {
        &self.features
    }

    /// Get the set of supported flags
    pub fn flags(&self) -> &HashSet<Flag> {
        &self.flags
    }

    /// Decide whether `case` may run on this host
    pub fn check(&self, case: &TestCase) -> GateDecision {
        if case.directives.skip {
            return GateDecision::Skip(SkipReason::Directive(
                case.directives
                    .comment
                    .clone()
                    .unwrap_or_else(|| "reftest skip".to_string()),
            ));
        }

        let missing: Vec<String> = case
            .metadata
            .unsupported_features(|f| self.supports_feature(f))
            .into_iter()
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return GateDecision::Skip(SkipReason::UnsupportedFeatures(missing));
        }

        let flags: Vec<Flag> = case
            .metadata
            .flags
            .iter()
            .filter(|f| !self.supports_flag(f))
            .cloned()
            .collect();
        if !flags.is_empty() {
            return GateDecision::Skip(SkipReason::UnsupportedFlags(flags));
        }

        GateDecision::Runnable
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}
