//! Interactive shell transport for controllers
//!
//! AireOS does not accept one-shot `ssh host command` execution, so the
//! session keeps a single `ssh -tt` child open and drives it like a terminal:
//! write a command, read until the CLI prompt comes back.

use crate::CollectError;
use crate::session::Session;
use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, instrument, warn};

/// Default AireOS prompt, e.g. `(Cisco Controller) >`
pub const DEFAULT_PROMPT_PATTERN: &str = r"\([^)]*\)\s*>\s*$";

const MORE_PATTERN: &str = r"--More(?:--| or \(q\)uit)[^\n]*$";
const USER_PROMPT: &str = "User:";
const PASSWORD_PROMPT: &str = "Password:";
const MAX_LOGIN_ATTEMPTS: usize = 3;

/// SSH destination for a controller
#[derive(Debug, Clone)]
pub struct SshTarget {
    /// Display name, used for output files
    pub name: String,
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub key_path: Option<String>,
    /// Credentials for the controller's own `User:`/`Password:` prompts
    pub login: LoginCredentials,
}

impl SshTarget {
    fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// Answers for in-shell login prompts
#[derive(Clone, Default)]
pub struct LoginCredentials {
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Prompt matching and timeouts
#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub prompt: Regex,
    more: Regex,
    pub command_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ShellOptions {
    pub fn new(
        prompt_pattern: &str,
        command_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, CollectError> {
        Ok(Self {
            prompt: Regex::new(prompt_pattern)?,
            more: Regex::new(MORE_PATTERN)?,
            command_timeout,
            connect_timeout,
        })
    }
}

/// What ended a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Prompt,
    User,
    Password,
}

/// A persistent interactive shell on one device
pub struct ShellSession {
    name: String,
    child: Child,
    stdin: ChildStdin,
    stdout: ChildStdout,
    options: ShellOptions,
}

impl ShellSession {
    /// Open an SSH shell to a controller and log in
    #[instrument(skip(target, options), fields(host = %target.host))]
    pub async fn connect(target: &SshTarget, options: ShellOptions) -> Result<Self, CollectError> {
        let mut ssh = Command::new("ssh");
        ssh.arg("-tt");

        if let Some(key) = &target.key_path {
            ssh.arg("-i").arg(key);
        }
        if let Some(port) = target.port {
            ssh.arg("-p").arg(port.to_string());
        }

        ssh.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                options.connect_timeout.as_secs().max(5)
            ))
            .arg(target.destination());

        Self::spawn(&target.name, ssh, options, &target.login).await
    }

    /// Drive an arbitrary interactive program as a device shell
    pub async fn spawn(
        name: &str,
        mut command: Command,
        options: ShellOptions,
        login: &LoginCredentials,
    ) -> Result<Self, CollectError> {
        debug!(device = %name, "Spawning shell session");

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CollectError::Transport(e.to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CollectError::Transport("shell stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CollectError::Transport("shell stdout unavailable".to_string()))?;

        let mut session = Self {
            name: name.to_string(),
            child,
            stdin,
            stdout,
            options,
        };
        session.login(login).await?;
        Ok(session)
    }

    async fn login(&mut self, login: &LoginCredentials) -> Result<(), CollectError> {
        let timeout = self.options.connect_timeout;
        let mut attempts = 0;

        loop {
            let (_, expect) = self.read_until(timeout).await?;
            match expect {
                Expect::Prompt => return Ok(()),
                Expect::User => {
                    attempts += 1;
                    if attempts > MAX_LOGIN_ATTEMPTS {
                        return Err(CollectError::Transport("login rejected".to_string()));
                    }
                    let user = login.user.as_deref().ok_or_else(|| {
                        CollectError::Transport("device asked for a user name".to_string())
                    })?;
                    self.send_line(user).await?;
                }
                Expect::Password => {
                    let password = login.password.as_deref().ok_or_else(|| {
                        CollectError::Transport(
                            "device asked for a password but none is configured".to_string(),
                        )
                    })?;
                    self.send_line(password).await?;
                }
            }
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), CollectError> {
        self.stdin
            .write_all(format!("{line}\n").as_bytes())
            .await
            .map_err(|e| CollectError::Transport(e.to_string()))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| CollectError::Transport(e.to_string()))
    }

    async fn read_until(&mut self, timeout: Duration) -> Result<(String, Expect), CollectError> {
        tokio::time::timeout(timeout, self.read_loop())
            .await
            .map_err(|_| CollectError::Timeout(timeout))?
    }

    async fn read_loop(&mut self) -> Result<(String, Expect), CollectError> {
        let mut buffer: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = self
                .stdout
                .read(&mut chunk)
                .await
                .map_err(|e| CollectError::Transport(e.to_string()))?;
            if n == 0 {
                return Err(CollectError::Transport(
                    "connection closed by remote host".to_string(),
                ));
            }
            buffer.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buffer).into_owned();

            if let Some(m) = self.options.more.find(&text) {
                buffer = text[..m.start()].as_bytes().to_vec();
                self.stdin
                    .write_all(b" ")
                    .await
                    .map_err(|e| CollectError::Transport(e.to_string()))?;
                self.stdin
                    .flush()
                    .await
                    .map_err(|e| CollectError::Transport(e.to_string()))?;
                continue;
            }

            if self.options.prompt.is_match(&text) {
                return Ok((text, Expect::Prompt));
            }
            let tail = text.trim_end();
            if tail.ends_with(USER_PROMPT) {
                return Ok((text, Expect::User));
            }
            if tail.ends_with(PASSWORD_PROMPT) {
                return Ok((text, Expect::Password));
            }
        }
    }

    /// Log out and stop the shell process
    pub async fn close(mut self) {
        // logout may ask whether to save unsaved config
        if self.send_line("logout").await.is_ok() {
            let _ = self.send_line("N").await;
        }

        match tokio::time::timeout(Duration::from_secs(2), self.child.wait()).await {
            Ok(_) => debug!(device = %self.name, "Shell session closed"),
            Err(_) => {
                if let Err(e) = self.child.kill().await {
                    warn!(device = %self.name, error = %e, "Failed to kill shell process");
                }
            }
        }
    }
}

#[async_trait]
impl Session for ShellSession {
    fn device_name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(device = %self.name))]
    async fn run_command(&mut self, command: &str) -> Result<String, CollectError> {
        debug!(cmd = %command, "Running device command");
        self.send_line(command).await?;

        let (raw, expect) = self.read_until(self.options.command_timeout).await?;
        if expect != Expect::Prompt {
            return Err(CollectError::Transport(
                "session fell back to the login prompt".to_string(),
            ));
        }
        Ok(clean_response(&raw, command, &self.options.prompt))
    }
}

/// Strip terminal noise from a raw response
///
/// Normalizes line endings, drops the echoed command line and the trailing
/// prompt.
pub fn clean_response(raw: &str, command: &str, prompt: &Regex) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "");
    let body = match prompt.find(&normalized) {
        Some(m) => &normalized[..m.start()],
        None => normalized.as_str(),
    };

    let mut lines: Vec<&str> = body.lines().collect();
    if lines
        .first()
        .is_some_and(|first| first.trim_end().ends_with(command.trim()))
    {
        lines.remove(0);
    }
    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}
