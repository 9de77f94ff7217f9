use serde::Serialize;
use tracing::debug;

use crate::registry::Instruction;

pub const TOAST_TTL_SECONDS: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastKind {
    Warning,
    Notice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
}

/// What an outcome asks of the feedback channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub toast: Option<Toast>,
}

impl Cue {
    pub fn silent() -> Self {
        Self { toast: None }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            toast: Some(Toast {
                kind: ToastKind::Warning,
                text: text.into(),
            }),
        }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self {
            toast: Some(Toast {
                kind: ToastKind::Notice,
                text: text.into(),
            }),
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(
            self.toast,
            Some(Toast {
                kind: ToastKind::Warning,
                ..
            })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedbackEvent {
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
}

/// Pending auto-hide of the current toast. Scheduling a new one replaces
/// (cancels) whatever was pending, so overlapping toasts never clear each other early.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScheduledExpiry {
    generation: u64,
    ttl_seconds: f32,
}

#[derive(Debug, Clone, Default)]
struct ToastSlot {
    current: Option<Toast>,
    expiry: Option<ScheduledExpiry>,
    next_generation: u64,
}

impl ToastSlot {
    fn show(&mut self, toast: Toast) -> u64 {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        self.current = Some(toast);
        self.expiry = Some(ScheduledExpiry {
            generation,
            ttl_seconds: TOAST_TTL_SECONDS,
        });
        generation
    }

    fn tick(&mut self, dt_seconds: f32) -> bool {
        let Some(expiry) = self.expiry.as_mut() else {
            return false;
        };
        expiry.ttl_seconds -= dt_seconds;
        if expiry.ttl_seconds > 0.0 {
            return false;
        }
        debug!(generation = expiry.generation, "toast_expired");
        self.cancel()
    }

    fn cancel(&mut self) -> bool {
        self.expiry = None;
        self.current.take().is_some()
    }
}

/// Derives instruction progress and transient toasts from procedure outcomes.
#[derive(Debug, Clone)]
pub struct FeedbackEmitter {
    instructions: Vec<Instruction>,
    shown_index: Option<usize>,
    toast: ToastSlot,
}

impl FeedbackEmitter {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions,
            shown_index: None,
            toast: ToastSlot::default(),
        }
    }

    pub fn final_index(&self) -> usize {
        self.instructions.len().saturating_sub(1)
    }

    pub fn current_index(&self) -> usize {
        self.shown_index.unwrap_or(0)
    }

    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.instructions.get(self.current_index())
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn active_toast(&self) -> Option<&Toast> {
        self.toast.current.as_ref()
    }

    /// Shows the instruction for `index`, capped at the final entry. Progress
    /// only moves forward; requests at or behind the shown index emit nothing.
    pub fn show_instruction(&mut self, index: usize) -> Option<FeedbackEvent> {
        let capped = index.min(self.final_index());
        if self.shown_index.is_some_and(|shown| capped <= shown) {
            return None;
        }
        let instruction = self.instructions.get(capped)?;
        self.shown_index = Some(capped);
        Some(FeedbackEvent::InstructionChanged {
            index: capped,
            text: instruction.text.clone(),
            image: instruction.image.clone(),
        })
    }

    /// Warnings never touch the instruction index; everything else may move it forward.
    pub fn apply(&mut self, instruction_index: usize, cue: Cue) -> Vec<FeedbackEvent> {
        let mut events = Vec::new();
        if !cue.is_warning() {
            events.extend(self.show_instruction(instruction_index));
        }
        if let Some(toast) = cue.toast {
            events.push(match toast.kind {
                ToastKind::Warning => FeedbackEvent::Warning {
                    text: toast.text.clone(),
                },
                ToastKind::Notice => FeedbackEvent::Notice {
                    text: toast.text.clone(),
                },
            });
            self.toast.show(toast);
        }
        events
    }

    /// Advances the toast timer; returns `ToastCleared` once it runs out.
    pub fn advance(&mut self, dt_seconds: f32) -> Option<FeedbackEvent> {
        self.toast
            .tick(dt_seconds)
            .then_some(FeedbackEvent::ToastCleared)
    }

    pub fn cancel_toast(&mut self) -> Option<FeedbackEvent> {
        self.toast.cancel().then_some(FeedbackEvent::ToastCleared)
    }

    /// Re-announces the shown instruction, e.g. when its flow regains focus.
    pub fn replay(&self) -> Option<FeedbackEvent> {
        let index = self.shown_index?;
        let instruction = self.instructions.get(index)?;
        Some(FeedbackEvent::InstructionChanged {
            index,
            text: instruction.text.clone(),
            image: instruction.image.clone(),
        })
    }

    /// Starts over from the first instruction, optionally with a new script.
    pub fn restart(&mut self, instructions: Option<Vec<Instruction>>) -> Vec<FeedbackEvent> {
        if let Some(instructions) = instructions {
            self.instructions = instructions;
        }
        self.shown_index = None;
        let mut events = Vec::new();
        events.extend(self.cancel_toast());
        events.extend(self.show_instruction(0));
        events
    }
}
