//! Reference launchers and terminators.
//!
//! `CommandLauncher` renders each launch request into an external command
//! (by default an `adb shell am start` line) and runs it. `LogLauncher` only
//! records what would have been launched.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use redial_core::CallTerminator;

use crate::launch::{AppLauncher, DispatchStep, LaunchError, LaunchRequest};

/// Marker `am start` prints on stdout when it could not resolve the target.
const AM_ERROR_MARKER: &str = "Error";

/// A program plus argument templates.
///
/// Arguments may contain `{uri}`, `{action}`, `{package}`, `{component}`,
/// `{identity}` and `{token}`; each is replaced by the request's value or by
/// an empty string. With `shell_quote` set, substituted values are quoted for
/// a POSIX shell, which is what `adb shell` hands its joined arguments to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandTemplate {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub shell_quote: bool,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            shell_quote: false,
        }
    }

    /// A template whose arguments end up on a remote shell command line.
    pub fn remote_shell(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            shell_quote: true,
            ..Self::new(program, args)
        }
    }

    /// Substitute request values into the argument templates.
    pub fn render(&self, request: &LaunchRequest) -> Vec<String> {
        let vars = [
            ("{uri}", request.uri.as_deref().unwrap_or_default()),
            ("{action}", request.action.as_str()),
            ("{package}", request.package.as_deref().unwrap_or_default()),
            ("{component}", request.component.as_deref().unwrap_or_default()),
            ("{identity}", request.extra("jid").unwrap_or_default()),
            ("{token}", request.extra("token").unwrap_or_default()),
        ];
        self.args
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, &(key, value)| {
                    if !acc.contains(key) {
                        acc
                    } else if self.shell_quote {
                        acc.replace(key, &shell_quote(value))
                    } else {
                        acc.replace(key, value)
                    }
                })
            })
            .collect()
    }
}

/// Quote `value` as a single POSIX shell word. Plain words pass unchanged.
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "@%+=:,./_-".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// `adb` templates for each dispatch step.
pub fn adb_templates() -> BTreeMap<DispatchStep, CommandTemplate> {
    let mut templates = BTreeMap::new();
    templates.insert(
        DispatchStep::CallDeepLink,
        CommandTemplate::remote_shell(
            "adb",
            &[
                "shell", "am", "start", "-a", "{action}", "-d", "{uri}", "-p", "{package}",
                "-f", "0x10000000", "--es", "token", "{token}",
            ],
        ),
    );
    templates.insert(
        DispatchStep::ChatOpen,
        CommandTemplate::remote_shell(
            "adb",
            &[
                "shell", "am", "start", "-a", "{action}", "-d", "{uri}", "-p", "{package}",
                "-f", "0x10000000", "--es", "token", "{token}",
            ],
        ),
    );
    templates.insert(
        DispatchStep::ConversationOpen,
        CommandTemplate::remote_shell(
            "adb",
            &[
                "shell", "am", "start", "-a", "{action}", "-n", "{package}/{component}",
                "-f", "0x10000000", "--es", "jid", "{identity}", "--es", "token", "{token}",
            ],
        ),
    );
    templates
}

pub fn adb_end_call() -> CommandTemplate {
    CommandTemplate::new("adb", &["shell", "input", "keyevent", "KEYCODE_ENDCALL"])
}

struct CommandOutput {
    success: bool,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
}

async fn run(program: &str, args: &[String], timeout: Duration) -> std::io::Result<CommandOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!(program = %program, args = ?args, "Executing command");

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, format!("'{program}' timed out")))??;

    Ok(CommandOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Launches by running one external command per step.
pub struct CommandLauncher {
    templates: BTreeMap<DispatchStep, CommandTemplate>,
    timeout: Duration,
}

impl CommandLauncher {
    pub fn new(templates: BTreeMap<DispatchStep, CommandTemplate>, timeout: Duration) -> Self {
        Self { templates, timeout }
    }

    pub fn adb(timeout: Duration) -> Self {
        Self::new(adb_templates(), timeout)
    }
}

#[async_trait]
impl AppLauncher for CommandLauncher {
    fn name(&self) -> &str {
        "command"
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<(), LaunchError> {
        let template = self
            .templates
            .get(&request.step)
            .ok_or(LaunchError::Unsupported(request.step))?;
        let args = template.render(request);

        let output = run(&template.program, &args, self.timeout).await?;
        if !output.success {
            let detail = if output.stderr.is_empty() { output.stdout } else { output.stderr };
            return Err(LaunchError::Rejected(format!(
                "exit code {:?}: {}",
                output.exit_code, detail
            )));
        }
        if output.stdout.contains(AM_ERROR_MARKER) {
            return Err(LaunchError::Rejected(output.stdout));
        }

        info!(step = %request.step, program = %template.program, "Launch command issued");
        Ok(())
    }
}

/// Dry-run launcher: logs every request and reports it issued.
#[derive(Debug, Default)]
pub struct LogLauncher;

#[async_trait]
impl AppLauncher for LogLauncher {
    fn name(&self) -> &str {
        "log"
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<(), LaunchError> {
        info!(
            step = %request.step,
            action = %request.action,
            uri = request.uri.as_deref().unwrap_or("-"),
            package = request.package.as_deref().unwrap_or("-"),
            component = request.component.as_deref().unwrap_or("-"),
            "Would launch"
        );
        Ok(())
    }
}

/// Hangs up by running an external command; success means the call ended.
pub struct CommandTerminator {
    name: String,
    template: CommandTemplate,
    timeout: Duration,
}

impl CommandTerminator {
    pub fn new(name: impl Into<String>, template: CommandTemplate, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            template,
            timeout,
        }
    }
}

#[async_trait]
impl CallTerminator for CommandTerminator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn terminate_current_call(&self) -> Result<bool> {
        let output = run(&self.template.program, &self.template.args, self.timeout).await?;
        if !output.success {
            warn!(terminator = %self.name, exit_code = ?output.exit_code, stderr = %output.stderr, "End-call command failed");
        }
        Ok(output.success)
    }
}

/// Dry-run terminator: logs and reports the call ended.
#[derive(Debug, Default)]
pub struct LogTerminator;

#[async_trait]
impl CallTerminator for LogTerminator {
    fn name(&self) -> &str {
        "log"
    }

    async fn terminate_current_call(&self) -> Result<bool> {
        info!("Would end the current call");
        Ok(true)
    }
}
