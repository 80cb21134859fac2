use anyhow::{anyhow, bail, Result};
use serde_json::Value;

use crate::models::WindowEvent;
use crate::timer::TimerController;

/// One line of input on the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Window(WindowEvent),
    Start,
    Pause,
    Reset,
    Status,
    History,
    Delete(String),
}

impl Command {
    /// JSON objects are window observations; anything else is a control word.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        if line.starts_with('{') {
            let event: WindowEvent = serde_json::from_str(line)
                .map_err(|err| anyhow!("malformed window event: {err}"))?;
            return Ok(Some(Command::Window(event)));
        }

        let mut words = line.split_whitespace();
        let command = match (words.next(), words.next()) {
            (Some("start"), None) => Command::Start,
            (Some("pause"), None) => Command::Pause,
            (Some("reset"), None) => Command::Reset,
            (Some("status"), None) => Command::Status,
            (Some("history"), None) => Command::History,
            (Some("delete"), Some(id)) => Command::Delete(id.to_string()),
            _ => bail!("unknown command '{line}'"),
        };
        if words.next().is_some() {
            bail!("unexpected arguments in '{line}'");
        }
        Ok(Some(command))
    }
}

/// Run a control command. Window events are routed by the caller, since they
/// go straight to the sensing feed.
pub async fn dispatch(controller: &TimerController, command: Command) -> Result<Value> {
    let reply = match command {
        Command::Window(_) => bail!("window events are not control commands"),
        Command::Start => serde_json::json!({ "started": controller.start().await? }),
        Command::Pause => serde_json::json!({ "paused": controller.pause().await? }),
        Command::Reset => serde_json::json!({ "archived": controller.reset().await? }),
        Command::Status => serde_json::to_value(controller.status().await)?,
        Command::History => serde_json::to_value(controller.history().await)?,
        Command::Delete(id) => {
            serde_json::json!({ "deleted": controller.delete_session(&id).await? })
        }
    };
    Ok(reply)
}
