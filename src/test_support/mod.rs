//! Test utilities and mocks for Quay unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use quay::test_support::{GraphFixture, MockRunner};
//!
//! #[test]
//! fn test_example() {
//!     let mut fx = GraphFixture::new();
//!     fx.node_module("web", &[]);
//!
//!     let runner = MockRunner::new();
//!     runner.fail_matching("npm install", 1);
//!     // Use mocks in tests...
//! }
//! ```

pub mod fixtures;

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Result;

use crate::util::process::{ProcessBuilder, ProcessRunner};

pub use fixtures::*;

/// A command seen by [`MockRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Program and arguments, space separated
    pub command: String,
    /// Working directory, if set
    pub cwd: Option<PathBuf>,
}

/// Process runner that records commands instead of spawning them.
///
/// Every command exits with 0 unless it contains a substring registered
/// with [`MockRunner::fail_matching`].
#[derive(Debug, Default)]
pub struct MockRunner {
    calls: Mutex<Vec<RecordedCall>>,
    failures: Mutex<Vec<(String, i32)>>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Make commands containing `substring` exit with `code`.
    pub fn fail_matching(&self, substring: &str, code: i32) -> &Self {
        self.failures
            .lock()
            .unwrap()
            .push((substring.to_string(), code));
        self
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded command lines, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl ProcessRunner for MockRunner {
    fn run(&self, cmd: &ProcessBuilder) -> Result<i32> {
        let args = cmd.get_args().join(" ");
        let program = cmd
            .get_program()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let command = if args.is_empty() {
            program
        } else {
            format!("{} {}", program, args)
        };

        self.calls.lock().unwrap().push(RecordedCall {
            command: command.clone(),
            cwd: cmd.get_cwd().map(|p| p.to_path_buf()),
        });

        let code = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(_, code)| *code)
            .unwrap_or(0);
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_runner_records_and_fails() {
        let runner = MockRunner::new();
        runner.fail_matching("--frozen-lockfile", 2);

        let ok = ProcessBuilder::new("/usr/bin/npm").args(["install"]).cwd("/tmp/x");
        let bad = ProcessBuilder::new("yarnpkg").args(["install", "--frozen-lockfile"]);

        assert_eq!(runner.run(&ok).unwrap(), 0);
        assert_eq!(runner.run(&bad).unwrap(), 2);
        assert_eq!(
            runner.commands(),
            vec!["npm install", "yarnpkg install --frozen-lockfile"]
        );
        assert_eq!(runner.calls()[0].cwd, Some(PathBuf::from("/tmp/x")));
    }
}
