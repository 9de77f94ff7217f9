use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ToolKind {
    Pins,
    Scissors,
    Forceps,
    Scalpel,
    #[default]
    None,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Pins,
        ToolKind::Scissors,
        ToolKind::Forceps,
        ToolKind::Scalpel,
        ToolKind::None,
    ];

    /// Parses a tool identifier as used by scene meshes, config files and the console.
    pub fn from_token(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pins" | "pin" | "dissectingpins" => Some(Self::Pins),
            "scissors" => Some(Self::Scissors),
            "forceps" => Some(Self::Forceps),
            "scalpel" => Some(Self::Scalpel),
            "none" => Some(Self::None),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Pins => "dissectingPins",
            Self::Scissors => "scissors",
            Self::Forceps => "forceps",
            Self::Scalpel => "scalpel",
            Self::None => "none",
        }
    }

    /// Cursor style the presentation layer applies while this tool is held.
    pub fn cursor_style(self) -> &'static str {
        match self {
            Self::Pins => "dissectingPins-cursor",
            Self::Scissors => "scissors-cursor",
            Self::Forceps => "forceps-cursor",
            Self::Scalpel => "scalpel-cursor",
            Self::None => "default",
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolChange {
    pub previous: ToolKind,
    pub current: ToolKind,
}

impl ToolChange {
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Holds the instrument currently in the user's hand.
#[derive(Debug, Clone, Default)]
pub struct ToolSelector {
    active: ToolKind,
}

impl ToolSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switching has no preconditions; any tool can be picked up at any time.
    pub fn select_tool(&mut self, tool: ToolKind) -> ToolChange {
        let previous = self.active;
        self.active = tool;
        info!(previous = %previous, current = %tool, "tool_selected");
        ToolChange {
            previous,
            current: tool,
        }
    }

    pub fn active_tool(&self) -> ToolKind {
        self.active
    }

    pub fn is_active(&self, tool: ToolKind) -> bool {
        self.active == tool
    }

    pub fn clear(&mut self) -> ToolChange {
        self.select_tool(ToolKind::None)
    }
}
