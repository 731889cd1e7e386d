use std::str::FromStr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::PlatformError;
use crate::platform::Platform;

const HELP: &str = "commands: list | get <name> | set <name> <0-100> | rebuild <name> | help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    List,
    Get { name: String },
    Set { name: String, position: u8 },
    Rebuild { name: String },
    Help,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match verb.to_ascii_lowercase().as_str() {
            "list" => Ok(ConsoleCommand::List),
            "help" => Ok(ConsoleCommand::Help),
            "get" if !rest.is_empty() => Ok(ConsoleCommand::Get {
                name: rest.to_string(),
            }),
            "rebuild" if !rest.is_empty() => Ok(ConsoleCommand::Rebuild {
                name: rest.to_string(),
            }),
            "set" => {
                // Names may contain spaces, the position is always the last token
                let (name, position) = rest
                    .rsplit_once(char::is_whitespace)
                    .ok_or_else(|| "usage: set <name> <0-100>".to_string())?;
                let position = position
                    .parse::<u8>()
                    .ok()
                    .filter(|position| *position <= 100)
                    .ok_or_else(|| format!("invalid position: {position}"))?;

                Ok(ConsoleCommand::Set {
                    name: name.trim().to_string(),
                    position,
                })
            }
            "" => Err("empty command".to_string()),
            _ => Err(format!("unknown command: {line}")),
        }
    }
}

/// Executes one command and renders the reply.
pub fn execute(platform: &mut Platform, command: ConsoleCommand) -> Result<String, PlatformError> {
    let reply = match command {
        ConsoleCommand::List => serde_json::to_string(&platform.snapshot())?,
        ConsoleCommand::Get { name } => {
            let controller = platform
                .get(&name)
                .ok_or(PlatformError::DeviceNotFound(name))?;
            serde_json::to_string(&controller.snapshot())?
        }
        ConsoleCommand::Set { name, position } => {
            // Fire and forget: pulse failures are logged by the controller
            let _ = platform.set_target(&name, position)?;
            let controller = platform
                .get(&name)
                .ok_or(PlatformError::DeviceNotFound(name))?;
            serde_json::to_string(&controller.snapshot())?
        }
        ConsoleCommand::Rebuild { name } => {
            platform.rebuild(&name)?;
            let controller = platform
                .get(&name)
                .ok_or(PlatformError::DeviceNotFound(name))?;
            serde_json::to_string(&controller.snapshot())?
        }
        ConsoleCommand::Help => HELP.to_string(),
    };

    Ok(reply)
}

/// Reads commands line by line until end of input.
pub async fn run<R, W>(platform: &mut Platform, reader: R, mut writer: W) -> Result<(), PlatformError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = match line.parse::<ConsoleCommand>() {
            Ok(command) => execute(platform, command).unwrap_or_else(|e| {
                tracing::warn!("Command failed: {}", e);
                format!("error: {e}")
            }),
            Err(e) => format!("error: {e}"),
        };

        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}
