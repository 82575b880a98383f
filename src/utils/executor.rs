//! Command execution abstraction for testability
//!
//! This module provides a trait-based abstraction for command execution,
//! enabling dependency injection and mocking for tests.

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

use super::command::CommandOutput;

/// Abstraction for command execution, enabling mocking in tests
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a command with optional timeout
    async fn run_command(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput>;
}

/// Default implementation using real subprocess calls
#[derive(Debug, Clone, Default)]
pub struct RealExecutor;

impl RealExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for RealExecutor {
    async fn run_command(
        &self,
        program: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        super::command::run_command(program, args, timeout).await
    }
}

/// A mock executor for testing that records calls and replays configured
/// responses in order. Available for use in external test crates.
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Recorded command invocation
    #[derive(Clone, Debug)]
    pub struct CommandCall {
        pub program: String,
        pub args: Vec<String>,
    }

    /// Response configuration for mock
    #[derive(Clone, Debug)]
    pub enum MockResponse {
        Success {
            stdout: String,
            stderr: String,
        },
        /// Process ran but exited non-zero
        Failure {
            stdout: String,
            stderr: String,
            exit_code: i32,
        },
        /// Process was killed at the time limit; stdout carries whatever
        /// it managed to print before the kill
        Timeout {
            stdout: String,
        },
        /// Process could not be spawned at all
        SpawnError {
            message: String,
        },
    }

    impl Default for MockResponse {
        fn default() -> Self {
            MockResponse::Success {
                stdout: String::new(),
                stderr: String::new(),
            }
        }
    }

    /// Mock executor for testing
    #[derive(Clone, Default)]
    pub struct MockExecutor {
        /// Recorded command invocations
        pub calls: Arc<Mutex<Vec<CommandCall>>>,
        /// Responses consumed one per call, in configuration order
        queue: Arc<Mutex<VecDeque<MockResponse>>>,
        /// Response used once the queue is empty
        default_response: Arc<Mutex<MockResponse>>,
    }

    impl MockExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the response for the next unanswered invocation
        pub fn expect(self, response: MockResponse) -> Self {
            self.queue.lock().unwrap().push_back(response);
            self
        }

        /// Set the response used once the queue is exhausted
        pub fn with_default_response(self, response: MockResponse) -> Self {
            *self.default_response.lock().unwrap() = response;
            self
        }

        /// Get all recorded calls
        pub fn get_calls(&self) -> Vec<CommandCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Check if a program was called
        pub fn was_called(&self, program: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.program == program)
        }

        /// Check if any call carried an argument containing the fragment
        pub fn was_called_with(&self, fragment: &str) -> bool {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .any(|c| c.args.iter().any(|a| a.contains(fragment)))
        }

        /// Get the total number of recorded calls
        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn record_call(&self, program: &str, args: &[&str]) {
            self.calls.lock().unwrap().push(CommandCall {
                program: program.to_string(),
                args: args.iter().map(|s| s.to_string()).collect(),
            });
        }

        fn next_response(&self) -> MockResponse {
            self.queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.default_response.lock().unwrap().clone())
        }
    }

    #[async_trait]
    impl CommandExecutor for MockExecutor {
        async fn run_command(
            &self,
            program: &str,
            args: &[&str],
            _timeout: Option<Duration>,
        ) -> Result<CommandOutput> {
            self.record_call(program, args);
            match self.next_response() {
                MockResponse::Success { stdout, stderr } => Ok(CommandOutput {
                    stdout,
                    stderr,
                    exit_code: Some(0),
                    timed_out: false,
                }),
                MockResponse::Failure {
                    stdout,
                    stderr,
                    exit_code,
                } => Ok(CommandOutput {
                    stdout,
                    stderr,
                    exit_code: Some(exit_code),
                    timed_out: false,
                }),
                MockResponse::Timeout { stdout } => Ok(CommandOutput {
                    stdout,
                    stderr: String::new(),
                    exit_code: None,
                    timed_out: true,
                }),
                MockResponse::SpawnError { message } => anyhow::bail!(message),
            }
        }
    }
}
