//! In-memory shell and server runtimes for dispatcher tests

use async_trait::async_trait;
use meshboot_core::domain::server::ServerDef;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::service::server::{RunningServer, ServerError, ServerRuntime};
use crate::service::shell::{CommandStatus, OutputSink, Shell};

/// One recorded shell invocation
#[derive(Debug, Clone)]
pub struct ShellCall {
    pub command: String,
    pub cwd: Option<PathBuf>,
    pub forwarded: bool,
}

/// Shell that records every command instead of running it
///
/// Commands exit 0 unless configured otherwise; configured output is written
/// to the sink when one is given.
#[derive(Default)]
pub struct RecordingShell {
    calls: Mutex<Vec<ShellCall>>,
    statuses: HashMap<String, i32>,
    outputs: HashMap<String, String>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, command: &str, code: i32) -> Self {
        self.statuses.insert(command.to_string(), code);
        self
    }

    pub fn with_output(mut self, command: &str, output: &str) -> Self {
        self.outputs.insert(command.to_string(), output.to_string());
        self
    }

    pub fn calls(&self) -> Vec<ShellCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.command == command)
            .count()
    }
}

#[async_trait]
impl Shell for RecordingShell {
    async fn run(
        &self,
        command: &str,
        cwd: Option<&Path>,
        sink: Option<OutputSink>,
    ) -> io::Result<CommandStatus> {
        self.calls.lock().unwrap().push(ShellCall {
            command: command.to_string(),
            cwd: cwd.map(Path::to_path_buf),
            forwarded: sink.is_some(),
        });

        if let (Some(sink), Some(output)) = (sink, self.outputs.get(command)) {
            File::from(sink).write_all(output.as_bytes())?;
        }

        let code = self.statuses.get(command).copied().unwrap_or(0);
        Ok(CommandStatus::from_code(code))
    }
}

/// Server runtime that records definitions and returns canned results
#[derive(Default)]
pub struct FakeServerRuntime {
    started: Mutex<Vec<ServerDef>>,
    fail_start: bool,
    fail_join: bool,
}

impl FakeServerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_join(mut self) -> Self {
        self.fail_join = true;
        self
    }

    pub fn started(&self) -> Vec<ServerDef> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl ServerRuntime for FakeServerRuntime {
    async fn start(&self, def: ServerDef) -> Result<Box<dyn RunningServer>, ServerError> {
        if self.fail_start {
            return Err(ServerError::NotConfigured);
        }
        self.started.lock().unwrap().push(def);
        Ok(Box::new(FakeServer {
            fail: self.fail_join,
        }))
    }
}

struct FakeServer {
    fail: bool,
}

#[async_trait]
impl RunningServer for FakeServer {
    async fn join(self: Box<Self>) -> Result<(), ServerError> {
        if self.fail {
            Err(ServerError::Exited(CommandStatus::signaled()))
        } else {
            Ok(())
        }
    }
}
