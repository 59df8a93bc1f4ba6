/*!
 * Device Control Facade
 * Four bluetoothctl operations, raw text in and out
 */

use std::time::Duration;

use crate::error::{FacadeError, Result};
use crate::runner::{CommandOutput, CommandRunner, Invocation, ProcessRunner, DEFAULT_TIMEOUT};
use crate::version::select_paired_listing;

pub struct DeviceFacade<R = ProcessRunner> {
    runner: R,
    timeout: Duration,
    strict_exit_status: bool,
}

impl Default for DeviceFacade<ProcessRunner> {
    fn default() -> Self {
        Self::new(ProcessRunner::default())
    }
}

impl<R: CommandRunner> DeviceFacade<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            timeout: DEFAULT_TIMEOUT,
            strict_exit_status: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Treat a non-zero exit as [`FacadeError::ExternalTool`] instead of
    /// returning stdout regardless.
    pub fn with_strict_exit_status(mut self, strict: bool) -> Self {
        self.strict_exit_status = strict;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `bluetoothctl show`
    pub async fn get_adapter_status(&self) -> Result<String> {
        self.call(&["show"]).await
    }

    /// `bluetoothctl devices Paired` on 5.66 and later, `paired-devices`
    /// before that or when the version cannot be read.
    pub async fn list_paired_devices(&self) -> Result<String> {
        let version = self.call(&["version"]).await?;
        let listing = select_paired_listing(&version);
        tracing::debug!("Listing paired devices with {:?}", listing);
        self.call(listing.args()).await
    }

    pub async fn get_device_info(&self, device: &str) -> Result<String> {
        self.call(&["info", device]).await
    }

    pub async fn toggle_device_connection(&self, device: &str, currently_connected: bool) -> Result<String> {
        let verb = if currently_connected { "disconnect" } else { "connect" };
        tracing::info!("Requesting {} for device: {}", verb, device);
        self.call(&[verb, device]).await
    }

    async fn call(&self, args: &[&str]) -> Result<String> {
        let invocation = Invocation::new(args.iter().copied(), self.timeout);
        let output = self.runner.run(&invocation).await?;
        self.check_exit(&invocation, output)
    }

    fn check_exit(&self, invocation: &Invocation, output: CommandOutput) -> Result<String> {
        if output.success() {
            return Ok(output.stdout);
        }

        tracing::warn!(
            "bluetoothctl {} exited with {:?}: {}",
            invocation.args.join(" "),
            output.status,
            output.stderr.trim_end()
        );

        if self.strict_exit_status {
            return Err(FacadeError::ExternalTool {
                status: output.status,
                stderr: output.stderr,
            });
        }

        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Answers each sub-command line with a scripted output and records calls.
    #[derive(Default)]
    struct ScriptedRunner {
        replies: HashMap<String, CommandOutput>,
        calls: Mutex<Vec<Invocation>>,
        timeout_on: Option<String>,
    }

    impl ScriptedRunner {
        fn reply(mut self, command: &str, stdout: &str) -> Self {
            self.replies.insert(
                command.to_string(),
                CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: String::new(),
                    status: Some(0),
                },
            );
            self
        }

        fn fail(mut self, command: &str, stdout: &str, stderr: &str, status: i32) -> Self {
            self.replies.insert(
                command.to_string(),
                CommandOutput {
                    stdout: stdout.to_string(),
                    stderr: stderr.to_string(),
                    status: Some(status),
                },
            );
            self
        }

        fn hang(mut self, command: &str) -> Self {
            self.timeout_on = Some(command.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|inv| inv.args.join(" "))
                .collect()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
            self.calls.lock().unwrap().push(invocation.clone());
            let line = invocation.args.join(" ");
            if self.timeout_on.as_deref() == Some(line.as_str()) {
                return Err(FacadeError::Timeout {
                    args: invocation.args.clone(),
                    timeout: invocation.timeout,
                });
            }
            Ok(self.replies.get(&line).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn adapter_status_is_verbatim() {
        let show = "Controller 00:1A:7D:DA:71:13 (public)\n\tName: steamdeck\n\tPowered: yes\n";
        let facade = DeviceFacade::new(ScriptedRunner::default().reply("show", show));

        assert_eq!(facade.get_adapter_status().await.unwrap(), show);
        assert_eq!(facade.runner().calls(), vec!["show"]);
    }

    #[tokio::test]
    async fn modern_listing_from_5_70() {
        let runner = ScriptedRunner::default()
            .reply("version", "Version 5.70\n")
            .reply("devices Paired", "Device AA:BB:CC:DD:EE:FF MyHeadset\n");
        let facade = DeviceFacade::new(runner);

        assert_eq!(
            facade.list_paired_devices().await.unwrap(),
            "Device AA:BB:CC:DD:EE:FF MyHeadset\n"
        );
        assert_eq!(facade.runner().calls(), vec!["version", "devices Paired"]);
    }

    #[tokio::test]
    async fn legacy_listing_before_5_66() {
        let runner = ScriptedRunner::default()
            .reply("version", "5.65")
            .reply("paired-devices", "Device 11:22:33:44:55:66 Pad\n");
        let facade = DeviceFacade::new(runner);

        assert_eq!(facade.list_paired_devices().await.unwrap(), "Device 11:22:33:44:55:66 Pad\n");
        assert_eq!(facade.runner().calls(), vec!["version", "paired-devices"]);
    }

    #[tokio::test]
    async fn legacy_listing_when_version_unreadable() {
        let facade = DeviceFacade::new(ScriptedRunner::default().reply("version", "unknown"));

        facade.list_paired_devices().await.unwrap();
        assert_eq!(facade.runner().calls(), vec!["version", "paired-devices"]);
    }

    #[tokio::test]
    async fn listing_keeps_tool_order() {
        let listing = "Device FF:00:00:00:00:01 Zed\nDevice 00:00:00:00:00:02 Alpha\n";
        let runner = ScriptedRunner::default()
            .reply("version", "bluetoothctl: 5.66")
            .reply("devices Paired", listing);

        assert_eq!(DeviceFacade::new(runner).list_paired_devices().await.unwrap(), listing);
    }

    #[tokio::test]
    async fn device_info_passes_identifier_through() {
        let info = "Device AA:BB:CC:DD:EE:FF (public)\n\tName: MyHeadset\n\tConnected: no\n";
        let runner = ScriptedRunner::default().reply("info AA:BB:CC:DD:EE:FF", info);
        let facade = DeviceFacade::new(runner);

        assert_eq!(facade.get_device_info("AA:BB:CC:DD:EE:FF").await.unwrap(), info);
        assert_eq!(facade.runner().calls(), vec!["info AA:BB:CC:DD:EE:FF"]);
    }

    #[tokio::test]
    async fn unknown_device_returns_tool_text() {
        let runner = ScriptedRunner::default().fail(
            "info not a mac",
            "Device not a mac not available\n",
            "",
            1,
        );
        let facade = DeviceFacade::new(runner);

        assert_eq!(
            facade.get_device_info("not a mac").await.unwrap(),
            "Device not a mac not available\n"
        );
        let calls = facade.runner().calls.lock().unwrap().clone();
        assert_eq!(calls[0].args, vec!["info", "not a mac"]);
    }

    #[tokio::test]
    async fn toggle_selects_verb_from_flag() {
        let runner = ScriptedRunner::default()
            .reply("connect AA:BB", "Attempting to connect to AA:BB\n")
            .reply("disconnect AA:BB", "Attempting to disconnect from AA:BB\n");
        let facade = DeviceFacade::new(runner);

        assert_eq!(
            facade.toggle_device_connection("AA:BB", false).await.unwrap(),
            "Attempting to connect to AA:BB\n"
        );
        assert_eq!(
            facade.toggle_device_connection("AA:BB", true).await.unwrap(),
            "Attempting to disconnect from AA:BB\n"
        );
        assert_eq!(facade.runner().calls(), vec!["connect AA:BB", "disconnect AA:BB"]);
    }

    #[tokio::test]
    async fn non_zero_exit_still_returns_stdout() {
        let runner = ScriptedRunner::default().fail(
            "connect AA:BB",
            "Failed to connect: org.bluez.Error.Failed\n",
            "ignored",
            1,
        );
        let facade = DeviceFacade::new(runner);

        assert_eq!(
            facade.toggle_device_connection("AA:BB", false).await.unwrap(),
            "Failed to connect: org.bluez.Error.Failed\n"
        );
    }

    #[tokio::test]
    async fn strict_mode_surfaces_non_zero_exit() {
        let runner = ScriptedRunner::default().fail("show", "", "No default controller", 1);
        let facade = DeviceFacade::new(runner).with_strict_exit_status(true);

        match facade.get_adapter_status().await {
            Err(FacadeError::ExternalTool { status, stderr }) => {
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "No default controller");
            }
            other => panic!("expected ExternalTool, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn timeout_propagates_and_skips_listing() {
        let facade = DeviceFacade::new(ScriptedRunner::default().hang("version"));

        let err = facade.list_paired_devices().await.unwrap_err();
        assert_eq!(err.kind(), "timeout");
        assert_eq!(facade.runner().calls(), vec!["version"]);
    }

    #[tokio::test]
    async fn timeout_is_forwarded_to_runner() {
        let facade = DeviceFacade::new(ScriptedRunner::default()).with_timeout(Duration::from_millis(250));

        facade.get_adapter_status().await.unwrap();
        let calls = facade.runner().calls.lock().unwrap().clone();
        assert_eq!(calls[0].timeout, Duration::from_millis(250));
        assert_eq!(DeviceFacade::<ProcessRunner>::default().timeout(), Duration::from_secs(10));
    }
}
