//! Session capability and the working-mode guard

use crate::{CollectError, CollectReport, Collector};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// A live command channel to one device
///
/// Commands are strictly request/response: `run_command` returns only once
/// the full response has been read. `&mut self` keeps a single caller.
#[async_trait]
pub trait Session: Send {
    /// Device name used in logs and output file names
    fn device_name(&self) -> &str;

    /// Send one command and return its raw output
    async fn run_command(&mut self, command: &str) -> Result<String, CollectError>;
}

/// Commands that switch a session into and out of working mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMode {
    pub setup_commands: Vec<String>,
    pub teardown_commands: Vec<String>,
    /// Check the device runs AireOS before collecting
    pub validate_os: bool,
}

impl SessionMode {
    /// Paging off for the run, back on afterwards
    pub fn aireos() -> Self {
        Self {
            setup_commands: vec!["config paging disable".to_string()],
            teardown_commands: vec!["config paging enable".to_string()],
            validate_os: true,
        }
    }
}

impl Default for SessionMode {
    fn default() -> Self {
        Self::aireos()
    }
}

/// A session held in working mode
///
/// Call [`WorkingSession::restore`] on every exit path.
pub struct WorkingSession<'a, S: Session + ?Sized> {
    session: &'a mut S,
    mode: &'a SessionMode,
    restored: bool,
}

impl<'a, S: Session + ?Sized> WorkingSession<'a, S> {
    /// Send the setup commands; on failure, restore and return the error
    #[instrument(skip_all, fields(device = %session.device_name()))]
    pub async fn enter(session: &'a mut S, mode: &'a SessionMode) -> Result<Self, CollectError> {
        let mut guard = Self {
            session,
            mode,
            restored: false,
        };

        for command in &mode.setup_commands {
            debug!(cmd = %command, "Entering working mode");
            if let Err(err) = guard.session().run_command(command).await {
                if let Err(restore_err) = guard.restore().await {
                    warn!(error = %restore_err, "Restore after failed setup also failed");
                }
                return Err(err);
            }
        }

        Ok(guard)
    }

    /// The underlying session
    pub fn session(&mut self) -> &mut S {
        &mut *self.session
    }

    /// Send every teardown command, even if an earlier one fails
    #[instrument(skip_all, fields(device = %self.session.device_name()))]
    pub async fn restore(mut self) -> Result<(), CollectError> {
        self.restored = true;
        let mut first_err = None;

        for command in &self.mode.teardown_commands {
            debug!(cmd = %command, "Restoring session mode");
            if let Err(err) = self.session.run_command(command).await {
                warn!(cmd = %command, error = %err, "Teardown command failed");
                first_err.get_or_insert(err);
            }
        }

        first_err.map_or(Ok(()), Err)
    }
}

impl<S: Session + ?Sized> Drop for WorkingSession<'_, S> {
    fn drop(&mut self) {
        if !self.restored {
            warn!(
                device = %self.session.device_name(),
                "Working session dropped without restoring session mode"
            );
        }
    }
}

/// Whether `show sysinfo` output comes from an AireOS controller
pub fn is_aireos_sysinfo(output: &str) -> bool {
    output.lines().any(|line| {
        let line = line.trim_start();
        (line.starts_with("Product Name") && line.contains("Cisco Controller"))
            || line.starts_with("Product Version")
    })
}

/// Fail unless the device identifies as an AireOS controller
pub async fn validate_aireos<S: Session + ?Sized>(session: &mut S) -> Result<(), CollectError> {
    let output = session.run_command("show sysinfo").await?;
    if is_aireos_sysinfo(&output) {
        return Ok(());
    }

    let first_line = output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("<empty response>");
    Err(CollectError::UnsupportedOs(format!(
        "expected AireOS, 'show sysinfo' returned: {first_line}"
    )))
}

/// Run a collector inside working mode, restoring the session on every path
///
/// A fatal collection error wins over a restore error; the latter is logged.
#[instrument(skip_all, fields(collector = collector.name(), device = %session.device_name()))]
pub async fn run_with_restore(
    collector: &dyn Collector,
    session: &mut dyn Session,
    mode: &SessionMode,
) -> Result<CollectReport, CollectError> {
    let mut working = WorkingSession::enter(session, mode).await?;

    let outcome = async {
        if mode.validate_os {
            validate_aireos(working.session()).await?;
        }
        collector.collect(working.session()).await
    }
    .await;

    let restored = working.restore().await;

    match (outcome, restored) {
        (Ok(report), Ok(())) => {
            info!(rows = report.table.rows.len(), "Collection finished");
            Ok(report)
        }
        (Ok(_), Err(restore_err)) => Err(restore_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(restore_err)) => {
            warn!(error = %restore_err, "Session restore failed after collection error");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReplaySession;
    use mockall::Sequence;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        Device {}

        #[async_trait]
        impl Session for Device {
            fn device_name(&self) -> &str;
            async fn run_command(&mut self, command: &str) -> Result<String, CollectError>;
        }
    }

    const SYSINFO: &str = "\
Manufacturer's Name.............................. Cisco Systems Inc.
Product Name..................................... Cisco Controller
Product Version.................................. 8.10.185.0
";

    #[test]
    fn test_sysinfo_detection() {
        assert!(is_aireos_sysinfo(SYSINFO));
        assert!(!is_aireos_sysinfo("% Invalid input detected at '^' marker."));
        assert!(!is_aireos_sysinfo(""));
    }

    #[tokio::test]
    async fn test_enter_and_restore_send_mode_commands() {
        let mut session = ReplaySession::from_map("wlc", HashMap::new());
        let mode = SessionMode::aireos();

        let working = WorkingSession::enter(&mut session, &mode).await.unwrap();
        working.restore().await.unwrap();

        assert_eq!(
            session.commands(),
            ["config paging disable", "config paging enable"]
        );
    }

    #[tokio::test]
    async fn test_failed_setup_still_restores() {
        let mut seq = Sequence::new();
        let mut device = MockDevice::new();
        device.expect_device_name().return_const("wlc".to_string());
        device
            .expect_run_command()
            .withf(|cmd| cmd == "config paging disable")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(CollectError::Transport("broken pipe".into())));
        device
            .expect_run_command()
            .withf(|cmd| cmd == "config paging enable")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(String::new()));

        let mode = SessionMode::aireos();
        let result = WorkingSession::enter(&mut device, &mode).await;
        assert!(matches!(result, Err(CollectError::Transport(_))));
    }

    #[tokio::test]
    async fn test_restore_attempts_every_command() {
        let mut device = MockDevice::new();
        device.expect_device_name().return_const("wlc".to_string());
        device
            .expect_run_command()
            .withf(|cmd| cmd == "first")
            .times(1)
            .returning(|_| Err(CollectError::Timeout(std::time::Duration::from_secs(1))));
        device
            .expect_run_command()
            .withf(|cmd| cmd == "second")
            .times(1)
            .returning(|_| Ok(String::new()));

        let mode = SessionMode {
            setup_commands: vec![],
            teardown_commands: vec!["first".to_string(), "second".to_string()],
            validate_os: false,
        };
        let working = WorkingSession::enter(&mut device, &mode).await.unwrap();
        let result = working.restore().await;
        assert!(matches!(result, Err(CollectError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_validate_rejects_other_os() {
        let mut session = ReplaySession::from_map(
            "switch",
            HashMap::from([(
                "show sysinfo".to_string(),
                "% Invalid input detected at '^' marker.".to_string(),
            )]),
        );
        let err = validate_aireos(&mut session).await.unwrap_err();
        assert!(matches!(err, CollectError::UnsupportedOs(_)));
    }

    #[tokio::test]
    async fn test_validate_accepts_aireos() {
        let mut session = ReplaySession::from_map(
            "wlc",
            HashMap::from([("show sysinfo".to_string(), SYSINFO.to_string())]),
        );
        validate_aireos(&mut session).await.unwrap();
    }
}
