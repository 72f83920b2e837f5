//! Scripted container runtime for integration tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use scrape_sandbox::{
    CommandOutput, ProcessRunner, Result, RunOutcome, SandboxConfig, SandboxLayout, SandboxManager,
};

/// One recorded invocation of the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub attached: bool,
}

impl Call {
    /// The runtime subcommand (`images`, `ps`, `build`, `run`, `stop`).
    pub fn subcommand(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Default)]
struct State {
    image_present: bool,
    running: bool,
    build_exit_code: i32,
    stop_exit_code: i32,
    run_outcomes: VecDeque<RunOutcome>,
    calls: Vec<Call>,
}

/// A fake runtime that tracks image and instance state across calls.
#[derive(Debug, Clone, Default)]
pub struct FakeRuntime {
    state: Arc<Mutex<State>>,
}

#[allow(dead_code)]
impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self) -> Self {
        self.state.lock().unwrap().image_present = true;
        self
    }

    pub fn with_running_instance(self) -> Self {
        self.state.lock().unwrap().running = true;
        self
    }

    pub fn failing_build(self, exit_code: i32) -> Self {
        self.state.lock().unwrap().build_exit_code = exit_code;
        self
    }

    pub fn failing_stop(self, exit_code: i32) -> Self {
        self.state.lock().unwrap().stop_exit_code = exit_code;
        self
    }

    /// Queues the outcome of the next attached `run`. Defaults to exit 0.
    pub fn next_run(self, outcome: RunOutcome) -> Self {
        self.state.lock().unwrap().run_outcomes.push_back(outcome);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| c.subcommand().to_string())
            .collect()
    }

    fn record(&self, program: &str, args: &[String], attached: bool) {
        self.state.lock().unwrap().calls.push(Call {
            program: program.to_string(),
            args: args.to_vec(),
            attached,
        });
    }
}

fn exited(code: i32, stdout: &str, stderr: &str) -> CommandOutput {
    CommandOutput {
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        exit_code: Some(code),
    }
}

#[async_trait]
impl ProcessRunner for FakeRuntime {
    async fn output(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        self.record(program, args, false);
        let mut state = self.state.lock().unwrap();

        let output = match args.first().map(String::as_str) {
            Some("images") if state.image_present => exited(0, "3f2a9c1b\n", ""),
            Some("images") => exited(0, "", ""),
            Some("ps") if state.running => exited(0, "a1b2c3d4\n", ""),
            Some("ps") => exited(0, "", ""),
            Some("build") if state.build_exit_code == 0 => {
                state.image_present = true;
                exited(0, "Successfully built\n", "")
            }
            Some("build") => exited(
                state.build_exit_code,
                "Step 1/4\n",
                "failed to solve: dockerfile parse error\n",
            ),
            Some("stop") if state.stop_exit_code == 0 => {
                state.running = false;
                exited(0, "stopped\n", "")
            }
            Some("stop") => exited(state.stop_exit_code, "", "permission denied\n"),
            _ => exited(125, "", "unknown command\n"),
        };
        Ok(output)
    }

    async fn run_attached(&self, program: &str, args: &[String]) -> Result<RunOutcome> {
        self.record(program, args, true);
        let mut state = self.state.lock().unwrap();
        Ok(state
            .run_outcomes
            .pop_front()
            .unwrap_or(RunOutcome::Exited(Some(0))))
    }
}

/// A temporary sandbox root with a manager driven by `runtime`.
pub struct Fixture {
    pub root: TempDir,
    pub manager: SandboxManager,
}

pub fn fixture(runtime: &FakeRuntime) -> Fixture {
    let root = TempDir::new().expect("failed to create temp dir");
    let layout = SandboxLayout::new(root.path()).expect("failed to create layout");
    let manager = SandboxManager::new(&SandboxConfig::default(), layout, Arc::new(runtime.clone()));
    Fixture { root, manager }
}

/// Writes a script into the fixture's scripts directory.
#[allow(dead_code)]
pub fn write_script(fixture: &Fixture, name: &str) {
    let dir = fixture.manager.layout().scripts_dir();
    std::fs::create_dir_all(&dir).expect("failed to create scripts dir");
    std::fs::write(dir.join(name), "print('hi')\n").expect("failed to write script");
}
