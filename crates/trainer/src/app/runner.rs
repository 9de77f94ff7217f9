use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use trainer_core::{Hit, Session, TargetId};
use tracing::{info, warn};

use super::bootstrap::AppWiring;
use super::console::{parse_script_commands, CommandRegistry, ParsedCommand, SessionCommand};
use super::transcript::{PresentationTranscript, SceneTranscript};

pub(crate) const OUT_PREFIX: &str = "out ";
/// How often toast timers move while waiting for input.
pub(crate) const IDLE_TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    Continue,
    Quit,
}

pub(crate) type TranscriptSession<W> = Session<SceneTranscript<W>, PresentationTranscript<W>>;

/// Feeds console lines into a session. Scene commands, presentation events
/// and console replies each go to their own writer as prefixed lines.
pub(crate) struct Runner<W: Write> {
    session: TranscriptSession<W>,
    commands: CommandRegistry,
    out: W,
}

impl<W: Write> Runner<W> {
    pub(crate) fn new(wiring: AppWiring, scene_out: W, ui_out: W, out: W) -> Self {
        let session = Session::new(
            wiring.definition,
            wiring.catalog,
            SceneTranscript::new(scene_out),
            PresentationTranscript::new(ui_out),
        );
        Self {
            session,
            commands: CommandRegistry::with_trainer_builtins(),
            out,
        }
    }

    pub(crate) fn session(&self) -> &TranscriptSession<W> {
        &self.session
    }

    pub(crate) fn advance(&mut self, dt_seconds: f32) {
        self.session.advance(dt_seconds);
    }

    pub(crate) fn handle_line(&mut self, line: &str) -> Control {
        match self.commands.parse_line(line) {
            Ok(None) => Control::Continue,
            Ok(Some(ParsedCommand::Help)) => {
                for line in self.commands.help_lines() {
                    self.say(&line);
                }
                Control::Continue
            }
            Ok(Some(ParsedCommand::Session(command))) => self.apply(command),
            Err(message) => {
                self.say(&message);
                Control::Continue
            }
        }
    }

    fn apply(&mut self, command: SessionCommand) -> Control {
        match command {
            SessionCommand::SelectTool { tool } => {
                let change = self.session.select_tool(tool);
                self.say(&format!("tool: {}", change.current));
            }
            SessionCommand::Click { target, point } => {
                let hit = Hit {
                    target: TargetId::new(target),
                    point,
                };
                let outcome = self.session.click(Some(hit));
                self.say_json(&outcome);
            }
            SessionCommand::Miss => {
                let outcome = self.session.click(None);
                self.say_json(&outcome);
            }
            SessionCommand::Pin { target } => {
                let outcome = self.session.submit_pin(&target);
                self.say_json(&outcome);
            }
            SessionCommand::Load { key } => {
                let reply = match self.session.load_specimen(&key) {
                    Ok(required) => format!("loaded {key}: {required} pin(s) required"),
                    Err(error) => format!("error: {error}"),
                };
                self.say(&reply);
            }
            SessionCommand::Preserve => {
                let reply = match self.session.preserve_current() {
                    None => "error: insect viewer is not open".to_string(),
                    Some(Ok(required)) => format!(
                        "loaded {}: {required} pin(s) required",
                        self.session.preservation().specimen_key().unwrap_or_default()
                    ),
                    Some(Err(error)) => format!("error: {error}"),
                };
                self.say(&reply);
            }
            SessionCommand::Reset => {
                self.session.reset();
                self.say("session reset");
            }
            SessionCommand::ResetPins => {
                self.session.reset_pins();
                self.say("pins reset");
            }
            SessionCommand::Tick { seconds } => self.session.advance(seconds),
            SessionCommand::Open { popup } => {
                let text = self.session.open_popup(popup);
                self.say_viewer(text);
            }
            SessionCommand::Close => {
                self.session.close_popup();
                self.say("viewer closed");
            }
            SessionCommand::Next => {
                if self.session.popup().is_none() {
                    self.say("error: no viewer is open");
                } else {
                    let text = self.session.viewer_next();
                    self.say_viewer(text);
                }
            }
            SessionCommand::Prev => {
                if self.session.popup().is_none() {
                    self.say("error: no viewer is open");
                } else {
                    let text = self.session.viewer_prev();
                    self.say_viewer(text);
                }
            }
            SessionCommand::Hover { target } => {
                let verdict = if self.session.hover(&target) {
                    "expected"
                } else {
                    "not expected"
                };
                self.say(&format!("hover {target}: {verdict}"));
            }
            SessionCommand::SwitchFlow { flow } => {
                self.session.set_flow(flow);
                self.say(&format!("flow: {flow:?}"));
            }
            SessionCommand::ValidateScene { meshes } => {
                let registry = &self.session.definition().registry;
                let reply = match registry.validate_scene(meshes.iter().map(String::as_str)) {
                    Ok(()) => "scene ok".to_string(),
                    Err(error) => format!("error: {error}"),
                };
                self.say(&reply);
            }
            SessionCommand::Status => {
                let snapshot = self.session.snapshot();
                self.say_json(&snapshot);
            }
            SessionCommand::Quit => return Control::Quit,
        }
        Control::Continue
    }

    fn say_viewer(&mut self, text: Option<String>) {
        match text {
            Some(text) => {
                for line in text.lines() {
                    self.say(line);
                }
            }
            None => self.say("(empty)"),
        }
    }

    fn say_json<T: Serialize>(&mut self, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.say(&json),
            Err(error) => warn!(error = %error, "reply_encode_failed"),
        }
    }

    fn say(&mut self, text: &str) {
        let written = writeln!(self.out, "{OUT_PREFIX}{text}").and_then(|()| self.out.flush());
        if let Err(error) = written {
            warn!(error = %error, "reply_write_failed");
        }
    }
}

/// Reads commands until end of input or `quit`. Input is read on its own
/// thread so toasts still expire while nobody is typing.
pub(crate) fn run_interactive<R, W>(runner: &mut Runner<W>, input: R) -> Result<(), String>
where
    R: BufRead + Send + 'static,
    W: Write,
{
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("trainer-stdin".to_string())
        .spawn(move || {
            for line in input.lines() {
                let failed = line.is_err();
                if tx.send(line).is_err() || failed {
                    break;
                }
            }
        })
        .map_err(|error| format!("spawn input reader: {error}"))?;
    drive_interactive(runner, &rx, IDLE_TICK)
}

/// Applies lines as they arrive and advances toast timers by wall-clock
/// time, at least every `idle_tick`.
pub(crate) fn drive_interactive<W: Write>(
    runner: &mut Runner<W>,
    lines: &Receiver<io::Result<String>>,
    idle_tick: Duration,
) -> Result<(), String> {
    let mut last_advance = Instant::now();
    loop {
        let received = lines.recv_timeout(idle_tick);
        let now = Instant::now();
        runner.advance(now.duration_since(last_advance).as_secs_f32());
        last_advance = now;
        match received {
            Ok(line) => {
                let line = line.map_err(|error| format!("read stdin: {error}"))?;
                if runner.handle_line(&line) == Control::Quit {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    info!(flow = ?runner.session().flow(), "interactive_session_ended");
    Ok(())
}

/// Replays a script file. Time only moves on explicit `tick` lines, so the
/// transcript is deterministic.
pub(crate) fn run_script<W: Write>(runner: &mut Runner<W>, path: &Path) -> Result<(), String> {
    let content = fs::read_to_string(path)
        .map_err(|error| format!("failed to read script file '{}': {error}", path.display()))?;
    let commands = parse_script_commands(&content);
    info!(path = %path.display(), commands = commands.len(), "script_started");
    for command in commands {
        if runner.handle_line(&command) == Control::Quit {
            break;
        }
    }
    Ok(())
}
