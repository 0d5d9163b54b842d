//! Line commands accepted on stdin.

use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Error};
use armory_core::FireMode;

/// Longest single `wait`, one day.
pub const MAX_WAIT_SECS: f64 = 86_400.0;

pub const HELP: &str = "\
commands:
  fire [n]          pull the trigger for n rounds (default 1)
  reload [id]       reload; press twice quickly to auto-reload, or pick a magazine/stack by id
  auto              reload from the fullest source, dropping the old magazine
  cycle             work the action or clear a jam
  clean             clean the barrel
  mode [mode]       select a fire mode, or step to the next one
  underbarrel       switch to or from the underbarrel weapon
  wait <secs>       let the barrel cool
  status            show the weapon state
  weapon [id]       list weapons or pick one up
  inventory         list the inventory
  save              write the session to disk
  quit              leave the range";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Fire(u32),
    Reload(Option<String>),
    AutoReload,
    Cycle,
    Clean,
    Mode(Option<FireMode>),
    Underbarrel,
    Wait(f64),
    Status,
    Weapon(Option<String>),
    Inventory,
    Save,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| anyhow!("empty command"))?
            .to_lowercase();
        let argument = words.next();
        if let Some(extra) = words.next() {
            bail!("unexpected argument '{extra}'");
        }

        let command = match verb.as_str() {
            "fire" | "f" => Command::Fire(match argument {
                Some(count) => count
                    .parse()
                    .with_context(|| format!("'{count}' is not a round count"))?,
                None => 1,
            }),
            "reload" | "r" => Command::Reload(argument.map(str::to_string)),
            "auto" => Command::AutoReload,
            "cycle" | "c" => Command::Cycle,
            "clean" => Command::Clean,
            "mode" | "m" => Command::Mode(argument.map(str::parse).transpose()?),
            "underbarrel" | "ub" => Command::Underbarrel,
            "wait" | "w" => {
                let raw = argument.ok_or_else(|| anyhow!("wait needs a number of seconds"))?;
                let seconds: f64 = raw
                    .parse()
                    .with_context(|| format!("'{raw}' is not a number of seconds"))?;
                if !seconds.is_finite() || seconds < 0.0 {
                    bail!("wait needs a non-negative number of seconds");
                }
                if seconds > MAX_WAIT_SECS {
                    bail!("wait is limited to {MAX_WAIT_SECS:.0} seconds");
                }
                Command::Wait(seconds)
            }
            "status" | "s" => Command::Status,
            "weapon" | "weapons" => Command::Weapon(argument.map(str::to_string)),
            "inventory" | "inv" | "i" => Command::Inventory,
            "save" => Command::Save,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command '{other}', try 'help'"),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_arguments() -> anyhow::Result<()> {
        assert_eq!("fire".parse::<Command>()?, Command::Fire(1));
        assert_eq!("FIRE 12".parse::<Command>()?, Command::Fire(12));
        assert_eq!("reload".parse::<Command>()?, Command::Reload(None));
        assert_eq!(
            "reload stanag-1".parse::<Command>()?,
            Command::Reload(Some("stanag-1".into()))
        );
        assert_eq!("mode".parse::<Command>()?, Command::Mode(None));
        assert_eq!(
            "mode full-auto".parse::<Command>()?,
            Command::Mode(Some(FireMode::Auto))
        );
        assert_eq!("wait 30".parse::<Command>()?, Command::Wait(30.0));
        assert_eq!("wait 86400".parse::<Command>()?, Command::Wait(MAX_WAIT_SECS));
        assert_eq!(
            "fire 4294967295".parse::<Command>()?,
            Command::Fire(u32::MAX)
        );
        assert_eq!("  q ".parse::<Command>()?, Command::Quit);
        Ok(())
    }

    #[test]
    fn rejects_malformed_input() {
        for line in [
            "",
            "fire lots",
            "wait",
            "wait -2",
            "wait 1e13",
            "wait inf",
            "mode laser",
            "dance",
            "fire 1 2",
        ] {
            assert!(line.parse::<Command>().is_err(), "{line:?} should not parse");
        }
    }
}
