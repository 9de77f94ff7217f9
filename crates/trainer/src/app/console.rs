use std::collections::HashMap;

use trainer_core::procedure::{Flow, Point3, Popup};
use trainer_core::ToolKind;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SessionCommand {
    SelectTool { tool: ToolKind },
    Click { target: String, point: Option<Point3> },
    Miss,
    Pin { target: String },
    Load { key: String },
    Preserve,
    Reset,
    ResetPins,
    Tick { seconds: f32 },
    Open { popup: Popup },
    Close,
    Next,
    Prev,
    Hover { target: String },
    SwitchFlow { flow: Flow },
    ValidateScene { meshes: Vec<String> },
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ParsedCommand {
    Help,
    Session(SessionCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CommandParseError {
    reason: String,
    usage: String,
}

impl CommandParseError {
    fn new(reason: impl Into<String>, usage: &str) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.to_string(),
        }
    }
}

type ParseFn = dyn Fn(&[String]) -> Result<ParsedCommand, CommandParseError>;
type BuiltinParse = fn(&[String]) -> Result<ParsedCommand, CommandParseError>;

pub(crate) struct CommandSpec {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn>,
}

/// Named console commands, matched case-insensitively and listed by `help`
/// in registration order.
pub(crate) struct CommandRegistry {
    specs: Vec<CommandSpec>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl CommandRegistry {
    pub(crate) fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub(crate) fn with_trainer_builtins() -> Self {
        let builtins: [(&str, &str, &str, BuiltinParse); 20] = [
            ("help", "List commands", "", parse_help),
            ("tool", "Select the active tool", "<pins|scissors|forceps|scalpel|none>", parse_tool),
            ("click", "Click a scene target", "<target> [x y z]", parse_click),
            ("miss", "Click empty space", "", parse_miss),
            ("pin", "Pin a specimen helper directly", "<helper>", parse_pin),
            ("load", "Load a catalog insect for preservation", "<insect_key>", parse_load),
            ("preserve", "Preserve the insect shown in the insect viewer", "", parse_preserve),
            ("reset", "Reset the whole session", "", parse_reset),
            ("reset_pins", "Remove all pins from the loaded insect", "", parse_reset_pins),
            ("tick", "Advance time", "<seconds:f32>", parse_tick),
            ("open", "Open a viewer popup", "<organs|insects>", parse_open),
            ("close", "Close the viewer popup", "", parse_close),
            ("next", "Show the next viewer entry", "", parse_next),
            ("prev", "Show the previous viewer entry", "", parse_prev),
            ("hover", "Check whether a target is the next expected one", "<target>", parse_hover),
            ("flow", "Switch the active procedure", "<dissection|preservation>", parse_flow),
            ("validate", "Check scene mesh names against the procedure", "<mesh...>", parse_validate),
            ("status", "Print session state as JSON", "", parse_status),
            ("quit", "Quit", "", parse_quit),
            ("exit", "Quit", "", parse_quit),
        ];

        let mut registry = Self::new();
        for (name, help, arg_schema, parse) in builtins {
            registry
                .register(name, help, arg_schema, parse)
                .expect("built-in command registration should not fail");
        }
        registry
    }

    pub(crate) fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<ParsedCommand, CommandParseError> + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }
        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name.insert(lower, self.specs.len() - 1);
        Ok(())
    }

    fn lookup(&self, input_name: &str) -> Option<&CommandSpec> {
        let index = self
            .lookup_by_lower_name
            .get(&input_name.to_ascii_lowercase())?;
        self.specs.get(*index)
    }

    pub(crate) fn help_lines(&self) -> Vec<String> {
        self.specs
            .iter()
            .map(|spec| {
                if spec.arg_schema.is_empty() {
                    format!("{} - {}", spec.name, spec.help)
                } else {
                    format!("{} {} - {}", spec.name, spec.arg_schema, spec.help)
                }
            })
            .collect()
    }

    /// Parses one console line. Blank lines yield `Ok(None)`; errors come back
    /// as a ready-to-print message.
    pub(crate) fn parse_line(&self, raw_line: &str) -> Result<Option<ParsedCommand>, String> {
        let tokens = tokenize_line(raw_line.trim())
            .map_err(|reason| format!("error: {reason}. usage: help"))?;
        let Some((command_name, args)) = tokens.split_first() else {
            return Ok(None);
        };
        let spec = self
            .lookup(command_name)
            .ok_or_else(|| format!("error: unknown command '{command_name}'. try: help"))?;
        (spec.parse)(args)
            .map(Some)
            .map_err(|error| format!("error: {}. usage: {}", error.reason, error.usage))
    }
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut pending = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                pending = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if pending {
                    tokens.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            _ => {
                current.push(ch);
                pending = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if pending {
        tokens.push(current);
    }
    Ok(tokens)
}

fn session(command: SessionCommand) -> Result<ParsedCommand, CommandParseError> {
    Ok(ParsedCommand::Session(command))
}

fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected extra arguments", usage))
    }
}

fn require_one_arg<'a>(
    args: &'a [String],
    name: &str,
    usage: &str,
) -> Result<&'a str, CommandParseError> {
    match args {
        [only] => Ok(only.as_str()),
        _ => Err(CommandParseError::new(
            format!("expected exactly one argument <{name}>"),
            usage,
        )),
    }
}

fn parse_help(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ParsedCommand::Help)
}

fn parse_tool(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "tool <pins|scissors|forceps|scalpel|none>";
    let raw = require_one_arg(args, "tool", USAGE)?;
    let tool = ToolKind::from_token(raw)
        .ok_or_else(|| CommandParseError::new(format!("unknown tool '{raw}'"), USAGE))?;
    session(SessionCommand::SelectTool { tool })
}

fn parse_click(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "click <target> [x y z]";
    let (target, coords) = match args {
        [target] => (target, None),
        [target, x, y, z] => (target, Some([x, y, z])),
        _ => {
            return Err(CommandParseError::new(
                "expected <target> or <target> <x> <y> <z>",
                USAGE,
            ))
        }
    };
    let point = match coords {
        Some(raw) => {
            let mut point = [0.0_f32; 3];
            let axes = ["x", "y", "z"].into_iter().zip(raw);
            for (slot, (axis, value)) in point.iter_mut().zip(axes) {
                *slot = value.parse::<f32>().map_err(|_| {
                    CommandParseError::new(
                        format!("invalid {axis} coordinate '{value}' (expected f32)"),
                        USAGE,
                    )
                })?;
            }
            Some(point)
        }
        None => None,
    };
    session(SessionCommand::Click {
        target: target.clone(),
        point,
    })
}

fn parse_miss(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "miss")?;
    session(SessionCommand::Miss)
}

fn parse_pin(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let target = require_one_arg(args, "helper", "pin <helper>")?;
    session(SessionCommand::Pin {
        target: target.to_string(),
    })
}

fn parse_load(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let key = require_one_arg(args, "insect_key", "load <insect_key>")?;
    session(SessionCommand::Load {
        key: key.to_string(),
    })
}

fn parse_preserve(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "preserve")?;
    session(SessionCommand::Preserve)
}

fn parse_reset(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "reset")?;
    session(SessionCommand::Reset)
}

fn parse_reset_pins(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "reset_pins")?;
    session(SessionCommand::ResetPins)
}

fn parse_tick(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "tick <seconds>";
    let raw = require_one_arg(args, "seconds", USAGE)?;
    let seconds = raw
        .parse::<f32>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .ok_or_else(|| {
            CommandParseError::new(
                format!("invalid seconds '{raw}' (expected non-negative f32)"),
                USAGE,
            )
        })?;
    session(SessionCommand::Tick { seconds })
}

fn parse_open(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "open <organs|insects>";
    let raw = require_one_arg(args, "viewer", USAGE)?;
    let popup = match raw.to_ascii_lowercase().as_str() {
        "organs" | "organ" => Popup::Organs,
        "insects" | "insect" => Popup::Insects,
        _ => {
            return Err(CommandParseError::new(
                format!("unknown viewer '{raw}' (expected organs|insects)"),
                USAGE,
            ))
        }
    };
    session(SessionCommand::Open { popup })
}

fn parse_close(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "close")?;
    session(SessionCommand::Close)
}

fn parse_next(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "next")?;
    session(SessionCommand::Next)
}

fn parse_prev(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "prev")?;
    session(SessionCommand::Prev)
}

fn parse_hover(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    let target = require_one_arg(args, "target", "hover <target>")?;
    session(SessionCommand::Hover {
        target: target.to_string(),
    })
}

fn parse_flow(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    const USAGE: &str = "flow <dissection|preservation>";
    let raw = require_one_arg(args, "flow", USAGE)?;
    let flow = match raw.to_ascii_lowercase().as_str() {
        "dissection" => Flow::Dissection,
        "preservation" => Flow::Preservation,
        _ => {
            return Err(CommandParseError::new(
                format!("unknown flow '{raw}' (expected dissection|preservation)"),
                USAGE,
            ))
        }
    };
    session(SessionCommand::SwitchFlow { flow })
}

fn parse_validate(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    if args.is_empty() {
        return Err(CommandParseError::new(
            "missing required argument <mesh...>",
            "validate <mesh...>",
        ));
    }
    session(SessionCommand::ValidateScene {
        meshes: args.to_vec(),
    })
}

fn parse_status(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "status")?;
    session(SessionCommand::Status)
}

fn parse_quit(args: &[String]) -> Result<ParsedCommand, CommandParseError> {
    require_no_args(args, "quit")?;
    session(SessionCommand::Quit)
}

/// Script files hold one command per line; blank lines and `#` comments are skipped.
pub(crate) fn parse_script_commands(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(ToString::to_string)
        .collect()
}
