//! Text commands for the interactive `realtime` prompt.
//!
//! Lines are parsed into [`ControlCommand`]s and applied to a
//! [`ControlSession`], which owns the chain and the registry. The audio
//! thread never sees any of this; it just follows the committed routes.

use anyhow::{anyhow, bail};
use rack_core::{ChainCommand, ChainController, InsertPosition, RoutingMode};
use rack_registry::PluginRegistry;

use super::common::{PluginSpec, add_plugin, describe_connections, parse_plugin_spec, print_chain};

/// Prompt help, one command per line.
pub const HELP: &str = "\
  add <id>[:k=v,..] [pos]   insert a plugin (appends without pos)
  remove <i>                remove entry i
  move <from> <to>          reorder
  up <i> | down <i>         move entry one step
  bypass <i> on|off         toggle bypass
  set <i> <key> <value>     set a parameter
  mono on|off               forced mono input
  gain <db>                 master gain
  list | graph | stats      show chain, connections, stream counters
  help | quit";

/// One parsed prompt command.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    /// Insert a plugin.
    Add {
        /// Plugin and parameter overrides.
        plugin: PluginSpec,
        /// Where to insert.
        position: InsertPosition,
    },
    /// Remove an entry.
    Remove(usize),
    /// Move an entry to a new index.
    Move {
        /// Current index.
        from: usize,
        /// Target index.
        to: usize,
    },
    /// Move an entry one step toward the input.
    Up(usize),
    /// Move an entry one step toward the output.
    Down(usize),
    /// Toggle bypass.
    Bypass {
        /// Entry index.
        index: usize,
        /// New state.
        bypassed: bool,
    },
    /// Forced mono on or off.
    Mono(bool),
    /// Master gain in dB.
    Gain(f32),
    /// Set a parameter on an entry.
    Set {
        /// Entry index.
        index: usize,
        /// Parameter key.
        key: String,
        /// New value (clamped by the node).
        value: f32,
    },
    /// Print the chain.
    List,
    /// Print the connection set.
    Graph,
    /// Print stream counters.
    Stats,
    /// Print the command list.
    Help,
    /// Stop.
    Quit,
}

/// Parse one prompt line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> anyhow::Result<Option<ControlCommand>> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&verb, args)) = words.split_first() else {
        return Ok(None);
    };

    let command = match (verb.to_ascii_lowercase().as_str(), args) {
        ("add", [spec]) => ControlCommand::Add {
            plugin: parse_plugin_spec(spec)?,
            position: InsertPosition::Append,
        },
        ("add", [spec, pos]) => ControlCommand::Add {
            plugin: parse_plugin_spec(spec)?,
            position: InsertPosition::At(index(pos)?),
        },
        ("remove" | "rm", [i]) => ControlCommand::Remove(index(i)?),
        ("move" | "mv", [from, to]) => ControlCommand::Move {
            from: index(from)?,
            to: index(to)?,
        },
        ("up", [i]) => ControlCommand::Up(index(i)?),
        ("down", [i]) => ControlCommand::Down(index(i)?),
        ("bypass", [i, state]) => ControlCommand::Bypass {
            index: index(i)?,
            bypassed: on_off(state)?,
        },
        ("mono", [state]) => ControlCommand::Mono(on_off(state)?),
        ("gain", [db]) => ControlCommand::Gain(number(db)?),
        ("set", [i, key, value]) => ControlCommand::Set {
            index: index(i)?,
            key: (*key).to_string(),
            value: number(value)?,
        },
        ("list" | "ls", []) => ControlCommand::List,
        ("graph", []) => ControlCommand::Graph,
        ("stats", []) => ControlCommand::Stats,
        ("help" | "?", []) => ControlCommand::Help,
        ("quit" | "exit" | "q", []) => ControlCommand::Quit,
        _ => bail!("unrecognized command '{}' (type 'help')", line.trim()),
    };
    Ok(Some(command))
}

fn index(word: &str) -> anyhow::Result<usize> {
    word.parse()
        .map_err(|_| anyhow!("'{word}' is not an entry index"))
}

fn number(word: &str) -> anyhow::Result<f32> {
    word.parse().map_err(|_| anyhow!("'{word}' is not a number"))
}

fn on_off(word: &str) -> anyhow::Result<bool> {
    match word.to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => bail!("expected on or off, got '{word}'"),
    }
}

impl ControlCommand {
    /// The chain mutation this command maps to, if it is one that needs no
    /// registry.
    fn chain_command(&self) -> Option<ChainCommand> {
        Some(match *self {
            Self::Remove(index) => ChainCommand::Remove { index },
            Self::Move { from, to } => ChainCommand::Move { from, to },
            Self::Up(index) => ChainCommand::MoveUp { index },
            Self::Down(index) => ChainCommand::MoveDown { index },
            Self::Bypass { index, bypassed } => ChainCommand::SetBypass { index, bypassed },
            Self::Mono(mono) => ChainCommand::SetRoutingMode(RoutingMode::from_mono(mono)),
            Self::Gain(db) => ChainCommand::SetMasterGainDb(db),
            _ => return None,
        })
    }
}

/// What the prompt loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading commands.
    Continue,
    /// Stop the stream and exit.
    Quit,
}

/// Control-side state of a live session.
pub struct ControlSession {
    /// The chain being edited.
    pub chain: ChainController,
    /// Plugins available to `add`.
    pub registry: PluginRegistry,
}

impl ControlSession {
    /// Apply one command and print its result.
    ///
    /// [`ControlCommand::Stats`] is owned by the stream and only acknowledged
    /// here.
    pub fn handle(&mut self, command: ControlCommand) -> anyhow::Result<Flow> {
        if let Some(mutation) = command.chain_command() {
            let before = self.chain.revision();
            self.chain.apply(mutation)?;
            if self.chain.revision() == before {
                println!("ok (no reroute)");
            } else {
                println!("ok (route revision {})", self.chain.revision());
            }
            return Ok(Flow::Continue);
        }

        match command {
            ControlCommand::Add { plugin, position } => {
                let index = add_plugin(&mut self.chain, &self.registry, &plugin, position)?;
                println!("added {} at [{index}]", plugin.uid);
            }
            ControlCommand::Set { index, key, value } => {
                let applied = self.chain.set_param(index, &key, value)?;
                println!("[{index}] {key} = {applied}");
            }
            ControlCommand::List => print_chain(&self.chain),
            ControlCommand::Graph => {
                for line in describe_connections(&self.chain) {
                    println!("  {line}");
                }
            }
            ControlCommand::Help => println!("{HELP}"),
            ControlCommand::Quit => return Ok(Flow::Quit),
            _ => {}
        }
        Ok(Flow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ControlSession {
        ControlSession {
            chain: ChainController::new(48000.0, 64).unwrap(),
            registry: PluginRegistry::new(),
        }
    }

    fn run(session: &mut ControlSession, line: &str) -> anyhow::Result<Flow> {
        let command = parse_command(line)?.expect("non-empty line");
        session.handle(command)
    }

    #[test]
    fn parses_every_verb() {
        assert_eq!(
            parse_command("add lowpass:cutoff=500 0").unwrap(),
            Some(ControlCommand::Add {
                plugin: PluginSpec {
                    uid: "lowpass".into(),
                    params: vec![("cutoff".into(), 500.0)],
                },
                position: InsertPosition::At(0),
            })
        );
        assert_eq!(
            parse_command("  MOVE 2 0 ").unwrap(),
            Some(ControlCommand::Move { from: 2, to: 0 })
        );
        assert_eq!(
            parse_command("bypass 1 on").unwrap(),
            Some(ControlCommand::Bypass {
                index: 1,
                bypassed: true
            })
        );
        assert_eq!(parse_command("mono off").unwrap(), Some(ControlCommand::Mono(false)));
        assert_eq!(parse_command("gain -6.5").unwrap(), Some(ControlCommand::Gain(-6.5)));
        assert_eq!(parse_command("down 3").unwrap(), Some(ControlCommand::Down(3)));
        assert_eq!(parse_command("q").unwrap(), Some(ControlCommand::Quit));
        assert_eq!(parse_command("   ").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_command("remove").is_err());
        assert!(parse_command("remove x").is_err());
        assert!(parse_command("bypass 0 maybe").is_err());
        assert!(parse_command("gain loud").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn session_edits_chain() {
        let mut s = session();
        run(&mut s, "add gain").unwrap();
        run(&mut s, "add lowpass:cutoff=900").unwrap();
        run(&mut s, "add swap 0").unwrap();
        let names: Vec<String> = s.chain.snapshot().entries.into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["Channel Swap", "Gain", "Lowpass"]);

        run(&mut s, "up 2").unwrap();
        run(&mut s, "bypass 0 on").unwrap();
        run(&mut s, "remove 1").unwrap();
        let snapshot = s.chain.snapshot();
        assert_eq!(snapshot.entries.len(), 2);
        assert!(snapshot.entries[0].bypassed);
        assert_eq!(snapshot.entries[1].name, "Gain");

        run(&mut s, "set 1 gain_db 100").unwrap();
        assert_eq!(s.chain.entry(1).unwrap().node().lock().get_param(0), Some(24.0));
    }

    #[test]
    fn failed_commands_leave_revision() {
        let mut s = session();
        let revision = s.chain.revision();
        assert!(run(&mut s, "remove 0").is_err());
        assert!(run(&mut s, "add nothing").is_err());
        assert!(run(&mut s, "set 0 gain_db 1").is_err());
        assert_eq!(s.chain.revision(), revision);

        run(&mut s, "mono off").unwrap();
        assert_eq!(s.chain.revision(), revision);
        run(&mut s, "gain -3").unwrap();
        assert_eq!(s.chain.master_gain_db(), -3.0);
        assert_eq!(run(&mut s, "quit").unwrap(), Flow::Quit);
    }
}
