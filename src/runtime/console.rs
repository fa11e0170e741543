//! Line-oriented operator console for the `run` subcommand.

use crate::market::Side;

#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleCommand {
    Bet { side: Side, amount: f64 },
    Claim(u64),
    Asset(String),
    Duration(u64),
    Analyze,
    State,
    Help,
    Quit,
}

pub const HELP: &str = "commands: up <amount> | down <amount> | claim <round> | asset <symbol> \
| duration <seconds> | analyze | state | help | quit";

fn arg<'a>(parts: &mut impl Iterator<Item = &'a str>, what: &str) -> Result<&'a str, String> {
    parts.next().ok_or_else(|| format!("missing {what}"))
}

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Err("empty command".to_string());
    };

    let command = match head.to_ascii_lowercase().as_str() {
        "up" | "down" | "higher" | "lower" => {
            let side: Side = head.parse()?;
            let raw = arg(&mut parts, "amount")?;
            let amount = raw
                .parse::<f64>()
                .map_err(|_| format!("invalid amount: {raw}"))?;
            ConsoleCommand::Bet { side, amount }
        }
        "claim" => {
            let raw = arg(&mut parts, "round id")?;
            let round = raw
                .trim_start_matches('#')
                .parse::<u64>()
                .map_err(|_| format!("invalid round id: {raw}"))?;
            ConsoleCommand::Claim(round)
        }
        "asset" => ConsoleCommand::Asset(arg(&mut parts, "asset symbol")?.to_ascii_uppercase()),
        "duration" => {
            let raw = arg(&mut parts, "duration")?;
            let secs = raw
                .trim_end_matches('s')
                .parse::<u64>()
                .map_err(|_| format!("invalid duration: {raw}"))?;
            ConsoleCommand::Duration(secs)
        }
        "analyze" => ConsoleCommand::Analyze,
        "state" => ConsoleCommand::State,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(format!("unknown command: {other}")),
    };

    if let Some(extra) = parts.next() {
        return Err(format!("unexpected argument: {extra}"));
    }
    Ok(command)
}
