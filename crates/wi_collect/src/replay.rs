//! Replay of captured device output
//!
//! A capture directory holds one file per command, named after the command
//! with spaces replaced by underscores (`show wlan 1` -> `show_wlan_1.txt`).
//! An optional `hostname` file names the device.

use crate::CollectError;
use crate::session::Session;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument};

const HOSTNAME_FILE: &str = "hostname";

/// A session that answers from captured output instead of a live device
#[derive(Debug, Clone, Default)]
pub struct ReplaySession {
    name: String,
    /// Keyed by capture file name
    responses: HashMap<String, String>,
    issued: Vec<String>,
}

impl ReplaySession {
    /// Build from command -> output pairs
    pub fn from_map(name: impl Into<String>, responses: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            responses: responses
                .into_iter()
                .map(|(cmd, text)| (capture_file_name(&cmd), text))
                .collect(),
            issued: Vec::new(),
        }
    }

    /// Load every `*.txt` capture in a directory
    #[instrument]
    pub fn from_dir(dir: &Path) -> Result<Self, CollectError> {
        let mut responses = HashMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.extension().is_some_and(|ext| ext == "txt") {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                responses.insert(file_name.to_string(), std::fs::read_to_string(&path)?);
            }
        }

        let hostname_path = dir.join(HOSTNAME_FILE);
        let name = if hostname_path.is_file() {
            std::fs::read_to_string(&hostname_path)?.trim().to_string()
        } else {
            dir.file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("replay")
                .to_string()
        };

        info!(device = %name, captures = responses.len(), "Loaded capture directory");
        Ok(Self {
            name,
            responses,
            issued: Vec::new(),
        })
    }

    /// Add or replace one captured response
    pub fn with_response(mut self, command: &str, output: impl Into<String>) -> Self {
        self.responses
            .insert(capture_file_name(command), output.into());
        self
    }

    pub fn has_capture(&self, command: &str) -> bool {
        self.responses.contains_key(&capture_file_name(command))
    }

    /// Commands issued so far, in order
    pub fn commands(&self) -> &[String] {
        &self.issued
    }
}

/// File name a command's output is captured under
pub fn capture_file_name(command: &str) -> String {
    format!("{}.txt", command.split_whitespace().collect::<Vec<_>>().join("_"))
}

#[async_trait]
impl Session for ReplaySession {
    fn device_name(&self) -> &str {
        &self.name
    }

    async fn run_command(&mut self, command: &str) -> Result<String, CollectError> {
        self.issued.push(command.to_string());
        match self.responses.get(&capture_file_name(command)) {
            Some(output) => Ok(output.clone()),
            None => {
                debug!(cmd = %command, "No capture for command, replaying empty output");
                Ok(String::new())
            }
        }
    }
}
