use std::collections::VecDeque;

use serde::Serialize;

use crate::registry::{Instruction, TargetId};

use super::feedback::FeedbackEvent;
use super::tools::ToolKind;

pub type Point3 = [f32; 3];

/// Nearest named object under the pointer, as resolved by the picking service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hit {
    pub target: TargetId,
    pub point: Option<Point3>,
}

impl Hit {
    pub fn at(target: impl Into<String>) -> Self {
        Self {
            target: TargetId::new(target),
            point: None,
        }
    }

    pub fn with_point(mut self, point: Point3) -> Self {
        self.point = Some(point);
        self
    }
}

pub trait Picking {
    fn resolved_hit(&mut self) -> Option<Hit>;
}

/// Picking service fed from an explicit queue, one resolved hit per click.
#[derive(Debug, Default)]
pub struct QueuedPicking {
    pending: VecDeque<Option<Hit>>,
}

impl QueuedPicking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hit: Option<Hit>) {
        self.pending.push_back(hit);
    }
}

impl Picking for QueuedPicking {
    fn resolved_hit(&mut self) -> Option<Hit> {
        self.pending.pop_front().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum SceneCommand {
    SetVisible {
        target: TargetId,
        visible: bool,
    },
    PlayAnimation {
        name: String,
    },
    PlaceMarker {
        position: Option<Point3>,
        target: TargetId,
    },
}

/// Fire-and-forget command sink into the 3D scene.
pub trait SceneSink {
    fn set_visible(&mut self, target: &TargetId, visible: bool);
    fn play_animation(&mut self, name: &str);
    fn place_marker(&mut self, position: Option<Point3>, target: &TargetId);

    fn apply(&mut self, command: &SceneCommand) {
        match command {
            SceneCommand::SetVisible { target, visible } => self.set_visible(target, *visible),
            SceneCommand::PlayAnimation { name } => self.play_animation(name),
            SceneCommand::PlaceMarker { position, target } => self.place_marker(*position, target),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PresentationEvent {
    InstructionChanged {
        index: usize,
        text: String,
        image: Option<String>,
    },
    Warning {
        text: String,
    },
    Notice {
        text: String,
    },
    ToastCleared,
    CursorStyleChanged {
        style: String,
    },
    ToolSelected {
        tool: ToolKind,
    },
}

pub trait Presentation {
    fn on_instruction_changed(&mut self, index: usize, instruction: &Instruction);
    fn on_warning(&mut self, text: &str);
    fn on_notice(&mut self, text: &str);
    fn on_toast_cleared(&mut self);
    fn on_cursor_style_changed(&mut self, tool: ToolKind);
    fn on_tool_selected(&mut self, tool: ToolKind);

    fn deliver(&mut self, event: &FeedbackEvent) {
        match event {
            FeedbackEvent::InstructionChanged { index, text, image } => {
                let instruction = Instruction {
                    text: text.clone(),
                    image: image.clone(),
                };
                self.on_instruction_changed(*index, &instruction);
            }
            FeedbackEvent::Warning { text } => self.on_warning(text),
            FeedbackEvent::Notice { text } => self.on_notice(text),
            FeedbackEvent::ToastCleared => self.on_toast_cleared(),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingScene {
    pub commands: Vec<SceneCommand>,
}

impl SceneSink for RecordingScene {
    fn set_visible(&mut self, target: &TargetId, visible: bool) {
        self.commands.push(SceneCommand::SetVisible {
            target: target.clone(),
            visible,
        });
    }

    fn play_animation(&mut self, name: &str) {
        self.commands.push(SceneCommand::PlayAnimation {
            name: name.to_string(),
        });
    }

    fn place_marker(&mut self, position: Option<Point3>, target: &TargetId) {
        self.commands.push(SceneCommand::PlaceMarker {
            position,
            target: target.clone(),
        });
    }
}

#[derive(Debug, Default)]
pub struct RecordingPresentation {
    pub events: Vec<PresentationEvent>,
}

impl RecordingPresentation {
    pub fn last_instruction(&self) -> Option<(usize, &str)> {
        self.events.iter().rev().find_map(|event| match event {
            PresentationEvent::InstructionChanged { index, text, .. } => {
                Some((*index, text.as_str()))
            }
            _ => None,
        })
    }

    pub fn warnings(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                PresentationEvent::Warning { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Presentation for RecordingPresentation {
    fn on_instruction_changed(&mut self, index: usize, instruction: &Instruction) {
        self.events.push(PresentationEvent::InstructionChanged {
            index,
            text: instruction.text.clone(),
            image: instruction.image.clone(),
        });
    }

    fn on_warning(&mut self, text: &str) {
        self.events.push(PresentationEvent::Warning {
            text: text.to_string(),
        });
    }

    fn on_notice(&mut self, text: &str) {
        self.events.push(PresentationEvent::Notice {
            text: text.to_string(),
        });
    }

    fn on_toast_cleared(&mut self) {
        self.events.push(PresentationEvent::ToastCleared);
    }

    fn on_cursor_style_changed(&mut self, tool: ToolKind) {
        self.events.push(PresentationEvent::CursorStyleChanged {
            style: tool.cursor_style().to_string(),
        });
    }

    fn on_tool_selected(&mut self, tool: ToolKind) {
        self.events.push(PresentationEvent::ToolSelected { tool });
    }
}
