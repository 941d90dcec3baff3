//! Command-line interface and REPL

use crate::groups::Waveform;
use crate::keyboard::resolve_note;
use crate::remote::RecorderAction;
use crate::surface::{PanelId, Surface};
use anyhow::{anyhow, bail, Context, Result};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

const DEFAULT_NOTE_MS: u64 = 300;

/// One parsed prompt line
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show(Option<PanelId>),
    Drag { panel: PanelId, knob: String, dy: f64 },
    Turn { panel: PanelId, knob: String, steps: i32 },
    Set { panel: PanelId, field: String, value: String },
    Waves,
    Recorder(RecorderAction),
    PresetList,
    PresetSave(String),
    PresetLoad(String),
    Play { note: &'static str, duration: Duration },
    Flush,
    Refresh,
    Help,
    Quit,
}

fn arg<'a>(args: &[&'a str], index: usize, what: &str) -> Result<&'a str> {
    args.get(index).copied().ok_or_else(|| anyhow!("Missing {}", what))
}

impl Command {
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&name, args)) = tokens.split_first() else {
            return Ok(None);
        };

        let cmd = match name.to_ascii_lowercase().as_str() {
            "show" | "ls" => Command::Show(args.first().map(|p| p.parse::<PanelId>()).transpose()?),
            "drag" => Command::Drag {
                panel: arg(args, 0, "panel")?.parse()?,
                knob: arg(args, 1, "knob")?.to_string(),
                dy: arg(args, 2, "distance in pixels")?
                    .parse::<f64>()
                    .context("Distance must be a number")?,
            },
            "turn" => Command::Turn {
                panel: arg(args, 0, "panel")?.parse()?,
                knob: arg(args, 1, "knob")?.to_string(),
                steps: args
                    .get(2)
                    .map(|s| s.parse::<i32>())
                    .transpose()
                    .context("Steps must be an integer")?
                    .unwrap_or(1),
            },
            "set" => {
                if args.len() < 3 {
                    bail!("Usage: set <panel> <field> <value>");
                }
                Command::Set {
                    panel: args[0].parse()?,
                    field: args[1].to_string(),
                    value: args[2..].join(" "),
                }
            }
            "waves" => Command::Waves,
            "rec" => Command::Recorder(arg(args, 0, "recorder action")?.parse().map_err(|e: String| anyhow!(e))?),
            "preset" => match arg(args, 0, "preset method")? {
                "list" => Command::PresetList,
                "save" => Command::PresetSave(args[1..].join(" ")),
                "load" => Command::PresetLoad(args[1..].join(" ")),
                other => bail!("Unknown preset method '{}' (list, save, load)", other),
            },
            "play" => {
                let input = arg(args, 0, "note")?;
                let note = resolve_note(input).ok_or_else(|| anyhow!("Unknown note '{}'", input))?;
                let ms = args
                    .get(1)
                    .map(|s| s.parse::<u64>())
                    .transpose()
                    .context("Duration must be whole milliseconds")?
                    .unwrap_or(DEFAULT_NOTE_MS);
                Command::Play {
                    note,
                    duration: Duration::from_millis(ms),
                }
            }
            "flush" => Command::Flush,
            "refresh" => Command::Refresh,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => bail!("Unknown command '{}' (try 'help')", other),
        };

        if let Command::PresetSave(name) | Command::PresetLoad(name) = &cmd {
            if name.is_empty() {
                bail!("Missing preset name");
            }
        }
        Ok(Some(cmd))
    }
}

/// Read prompt lines on a dedicated thread; the channel closes on EOF
pub fn spawn_line_reader() -> Result<mpsc::UnboundedReceiver<String>> {
    let mut rl = DefaultEditor::new()?;
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::Builder::new()
        .name("repl".to_string())
        .spawn(move || loop {
            match rl.readline("synth> ") {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    let _ = tx.send("quit".to_string());
                    break;
                }
                Err(e) => {
                    debug!("Prompt closed: {}", e);
                    break;
                }
            }
        })
        .context("Failed to start prompt thread")?;

    Ok(rx)
}

/// Run the prompt until `quit` or end of input
pub async fn run_repl(surface: &mut Surface) -> Result<()> {
    let mut lines = spawn_line_reader()?;
    print_help();
    show(surface, None);

    while let Some(line) = lines.recv().await {
        let cmd = match Command::parse(&line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => continue,
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                continue;
            }
        };
        if cmd == Command::Quit {
            break;
        }
        if let Err(e) = execute(surface, cmd).await {
            println!("{} {:#}", "✗".red(), e);
        }
    }

    Ok(())
}

pub async fn execute(surface: &mut Surface, cmd: Command) -> Result<()> {
    match cmd {
        Command::Show(panel) => show(surface, panel),
        Command::Drag { panel, knob, dy } => report(surface.drag(panel, &knob, dy)?),
        Command::Turn { panel, knob, steps } => report(surface.turn(panel, &knob, steps)?),
        Command::Set { panel, field, value } => {
            surface.set(panel, &field, &value).await?;
            println!("{} {}.{} = {}", "✓".green(), panel, field, value);
        }
        Command::Waves => {
            let names: Vec<&str> = Waveform::ALL.iter().map(|w| w.as_str()).collect();
            println!("{}", names.join(", "));
        }
        Command::Recorder(action) => {
            surface.recorder_action(action).await?;
            println!("{} {}", "✓".green(), action);
        }
        Command::PresetList => {
            let presets = surface.list_presets().await?;
            if presets.is_empty() {
                println!("{}", "No presets".dimmed());
            }
            for preset in presets {
                println!("  {}", preset.name.cyan());
            }
        }
        Command::PresetSave(name) => {
            let updated = surface.save_preset(&name).await?;
            let verb = if updated { "Updated" } else { "Saved" };
            println!("{} {} preset '{}'", "✓".green(), verb, name);
        }
        Command::PresetLoad(name) => {
            surface.load_preset(&name).await?;
            println!("{} Loaded preset '{}'", "✓".green(), name);
        }
        Command::Play { note, duration } => {
            surface.note_on(note).await?;
            tokio::time::sleep(duration).await;
            surface.note_off(note).await?;
        }
        Command::Flush => surface.flush_all().await?,
        Command::Refresh => surface.refresh_all(),
        Command::Help => print_help(),
        Command::Quit => {}
    }
    Ok(())
}

fn report(sent: Option<f64>) {
    match sent {
        Some(value) => println!("{} {}", "→".green(), value),
        None => println!("{}", "(no change)".dimmed()),
    }
}

fn show(surface: &Surface, panel: Option<PanelId>) {
    let blocks = match panel {
        Some(id) => match surface.panel(id) {
            Ok(p) => vec![p.render()],
            Err(e) => {
                println!("{} {}", "✗".red(), e);
                return;
            }
        },
        None => surface.render(),
    };
    for block in blocks {
        let mut lines = block.into_iter();
        if let Some(title) = lines.next() {
            println!("{}", title.bold().cyan());
        }
        for line in lines {
            println!("{}", line);
        }
    }
}

fn print_help() {
    println!("\n{}", "=== Synth Surface ===".bold().cyan());
    println!("Panels: {} (effects), {}..{} (oscillators), {} (recorder)", "fx".yellow(), "osc1".yellow(), "oscN".yellow(), "rec".yellow());
    println!("  show [panel]                    Knob readouts and sync status");
    println!("  drag <panel> <knob> <px>        Drag a knob up (or down, negative)");
    println!("  turn <panel> <knob> [steps]     Step a knob");
    println!("  set <panel> <field> <value>     Edit any field, e.g. set osc1 sound Saw");
    println!("  waves                           Available oscillator sounds");
    println!("  rec <record|stop|clear>         Recorder transport on the selected track");
    println!("  preset <list|save|load> [name]  Presets");
    println!("  play <key|note> [ms]            Play a note, e.g. play q or play C4");
    println!("  flush | refresh                 Send pending edits now | re-read the server");
    println!("  quit");
    println!("Knobs are named by label with dashes (echo-mix) or by field path (echo.mix).\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_knob_commands() {
        assert_eq!(
            Command::parse("drag fx echo-mix -25").unwrap(),
            Some(Command::Drag {
                panel: PanelId::Effects,
                knob: "echo-mix".to_string(),
                dy: -25.0
            })
        );
        assert_eq!(
            Command::parse("turn osc2 volume").unwrap(),
            Some(Command::Turn {
                panel: PanelId::Oscillator(1),
                knob: "volume".to_string(),
                steps: 1
            })
        );
        assert!(Command::parse("drag fx gain far").is_err());
    }

    #[test]
    fn test_parse_set_joins_value() {
        assert_eq!(
            Command::parse("set osc1 sound Super Saw").unwrap(),
            Some(Command::Set {
                panel: PanelId::Oscillator(0),
                field: "sound".to_string(),
                value: "Super Saw".to_string()
            })
        );
        assert!(Command::parse("set osc1 sound").is_err());
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(Command::parse("rec stop").unwrap(), Some(Command::Recorder(RecorderAction::Stop)));
        assert_eq!(
            Command::parse("play q 100").unwrap(),
            Some(Command::Play {
                note: "C4",
                duration: Duration::from_millis(100)
            })
        );
        assert_eq!(Command::parse("preset save My Pad").unwrap(), Some(Command::PresetSave("My Pad".to_string())));
        assert!(Command::parse("preset load").is_err());
        assert!(Command::parse("preset delete x").is_err());
        assert!(Command::parse("explode").is_err());
        assert_eq!(Command::parse("EXIT").unwrap(), Some(Command::Quit));
    }
}
