// Shared fixtures for orchestrator integration tests: a recording
// `CommandRunner` and a host layout inside a temp directory.
#![allow(dead_code, clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use cpdotnet_core::exec::command_line;
use cpdotnet_core::{CommandRunner, CoreError, ExecOutput, HostConfig, Orchestrator};

pub const DOMAIN: &str = "example.com";

/// A scripted response for commands whose line contains `pattern`.
struct Rule {
    pattern: String,
    output: ExecOutput,
    delay: Option<Duration>,
}

/// Records every invocation and answers from a list of rules.
///
/// Unmatched commands succeed with empty output, except that
/// `systemctl show` reports `active` and `journalctl` returns three lines.
#[derive(Default)]
pub struct FakeRunner {
    calls: Mutex<Vec<String>>,
    rules: Mutex<Vec<Rule>>,
}

impl FakeRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make commands containing `pattern` exit with `code` and `stderr`.
    pub fn fail_on(&self, pattern: &str, code: i32, stderr: &str) {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.into(),
            output: ExecOutput {
                code,
                stdout: String::new(),
                stderr: stderr.into(),
            },
            delay: None,
        });
    }

    /// Make commands containing `pattern` take `delay` before succeeding.
    pub fn delay_on(&self, pattern: &str, delay: Duration) {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.into(),
            output: ExecOutput::default(),
            delay: Some(delay),
        });
    }

    pub fn clear_rules(&self) {
        self.rules.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, line: &str) -> bool {
        self.calls().iter().any(|call| call == line)
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<ExecOutput, CoreError> {
        let line = command_line(program, args);
        self.calls.lock().unwrap().push(line.clone());

        let scripted = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|rule| line.contains(&rule.pattern))
            .map(|rule| (rule.output.clone(), rule.delay));
        if let Some((output, delay)) = scripted {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            return Ok(output);
        }

        let stdout = if line.starts_with("systemctl show") {
            "active\n".to_owned()
        } else if program == "journalctl" {
            "starting\nlistening on http://127.0.0.1:5000\nready\n".to_owned()
        } else {
            String::new()
        };
        Ok(ExecOutput {
            code: 0,
            stdout,
            stderr: String::new(),
        })
    }
}

/// A host rooted in a temp directory plus an orchestrator wired to a fake.
pub struct Host {
    pub dir: TempDir,
    pub config: HostConfig,
    pub runner: Arc<FakeRunner>,
    pub orchestrator: Orchestrator,
}

impl Host {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = HostConfig {
            state_dir: dir.path().join("state"),
            sites_root: dir.path().join("sites"),
            ..HostConfig::default()
        };
        config.proxy.vhost_dir = dir.path().join("vhosts");
        config.proxy.reload_command = vec!["nginx".into(), "-s".into(), "reload".into()];
        config.service.unit_dir = dir.path().join("units");
        config.release_retention = 2;

        let runner = FakeRunner::new();
        let orchestrator = Orchestrator::new(config.clone(), runner.clone()).unwrap();
        Self {
            dir,
            config,
            runner,
            orchestrator,
        }
    }

    /// Reopen the orchestrator on the same directories, as a new process would.
    pub fn reopen(&self) -> Orchestrator {
        Orchestrator::new(self.config.clone(), self.runner.clone()).unwrap()
    }

    /// A non-empty build directory named `name`.
    pub fn build(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join("builds").join(name);
        std::fs::create_dir_all(path.join("wwwroot")).unwrap();
        std::fs::write(path.join("App.dll"), name.as_bytes()).unwrap();
        std::fs::write(path.join("wwwroot/index.html"), b"<h1>hi</h1>").unwrap();
        path
    }

    pub fn fragment(&self, domain: &str) -> Option<String> {
        std::fs::read_to_string(self.config.proxy.vhost_dir.join(format!("{domain}.conf"))).ok()
    }

    pub fn unit_file(&self, domain: &str) -> Option<String> {
        std::fs::read_to_string(
            self.config
                .service
                .unit_dir
                .join(format!("dotnet-{domain}.service")),
        )
        .ok()
    }

    pub fn live_dir(&self, domain: &str) -> PathBuf {
        self.config.sites_root.join(domain).join("current")
    }

    pub fn live_target(&self, domain: &str) -> PathBuf {
        std::fs::read_link(self.live_dir(domain)).unwrap()
    }

    pub fn release_count(&self, domain: &str) -> usize {
        let releases = self.config.sites_root.join(domain).join("releases");
        match std::fs::read_dir(releases) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
