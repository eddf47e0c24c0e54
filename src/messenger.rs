//! Text message delivery.

use std::env;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::config::MessengerConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    NotSent,
}

pub trait Messenger: Send {
    /// Whether this device can send text messages at all.
    fn is_available(&self) -> bool;

    fn send(&mut self, recipient: &str, body: &str) -> Result<DeliveryStatus>;
}

/// Builds the messenger described by the config.
pub fn from_config(config: &MessengerConfig) -> Box<dyn Messenger> {
    if config.dry_run {
        Box::new(DryRunMessenger)
    } else if config.command.is_empty() {
        Box::new(UnavailableMessenger)
    } else {
        Box::new(CommandMessenger::new(config.command.clone()))
    }
}

/// Runs an external program per message, e.g.
/// `["termux-sms-send", "-n", "{number}", "{message}"]`.
#[derive(Debug, Clone)]
pub struct CommandMessenger {
    argv: Vec<String>,
}

impl CommandMessenger {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }

    fn render_args(&self, recipient: &str, body: &str) -> Vec<String> {
        self.argv
            .iter()
            .skip(1)
            .map(|arg| arg.replace("{number}", recipient).replace("{message}", body))
            .collect()
    }
}

impl Messenger for CommandMessenger {
    fn is_available(&self) -> bool {
        self.argv.first().is_some_and(|program| program_exists(program))
    }

    fn send(&mut self, recipient: &str, body: &str) -> Result<DeliveryStatus> {
        let Some(program) = self.argv.first() else {
            return Ok(DeliveryStatus::NotSent);
        };
        let status = Command::new(program)
            .args(self.render_args(recipient, body))
            .stdin(Stdio::null())
            .status()
            .map_err(|source| Error::MessengerSpawn {
                program: program.clone(),
                source,
            })?;

        debug!(program = %program, status = %status, "messenger command finished");
        Ok(if status.success() {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::NotSent
        })
    }
}

/// Logs the message instead of sending it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunMessenger;

impl Messenger for DryRunMessenger {
    fn is_available(&self) -> bool {
        true
    }

    fn send(&mut self, recipient: &str, body: &str) -> Result<DeliveryStatus> {
        info!(recipient, body, "dry run: message not sent");
        Ok(DeliveryStatus::Sent)
    }
}

/// A device without messaging.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableMessenger;

impl Messenger for UnavailableMessenger {
    fn is_available(&self) -> bool {
        false
    }

    fn send(&mut self, _recipient: &str, _body: &str) -> Result<DeliveryStatus> {
        Ok(DeliveryStatus::NotSent)
    }
}

/// A program with a path component must exist as given; a bare name is
/// looked up on `PATH`.
fn program_exists(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn from_config_picks_messenger() {
        let unavailable = from_config(&MessengerConfig::default());
        assert!(!unavailable.is_available());

        let dry = from_config(&MessengerConfig {
            command: Vec::new(),
            dry_run: true,
        });
        assert!(dry.is_available());
    }

    #[test]
    fn render_args_substitutes_placeholders() {
        let messenger = CommandMessenger::new(argv(&["sms", "-n", "{number}", "say: {message}"]));
        assert_eq!(
            messenger.render_args("5550100", "Emergency!"),
            argv(&["-n", "5550100", "say: Emergency!"])
        );
    }

    #[test]
    fn missing_program_is_unavailable() {
        let messenger = CommandMessenger::new(argv(&["/definitely/not/here/sms-send"]));
        assert!(!messenger.is_available());
        assert!(!CommandMessenger::new(Vec::new()).is_available());
    }

    #[cfg(unix)]
    #[test]
    fn command_exit_status_maps_to_delivery() {
        let mut ok = CommandMessenger::new(argv(&["/bin/sh", "-c", "exit 0", "{number}"]));
        assert!(ok.is_available());
        assert_eq!(ok.send("5550100", "hi").expect("send"), DeliveryStatus::Sent);

        let mut failing = CommandMessenger::new(argv(&["/bin/sh", "-c", "exit 3"]));
        assert_eq!(
            failing.send("5550100", "hi").expect("send"),
            DeliveryStatus::NotSent
        );
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let mut messenger = CommandMessenger::new(argv(&["/definitely/not/here/sms-send"]));
        let err = messenger.send("5550100", "hi").unwrap_err();
        assert!(matches!(err, Error::MessengerSpawn { .. }));
    }
}
