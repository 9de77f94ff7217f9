use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::procedure::ToolKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn from_token(raw: &str) -> Option<Self> {
        match raw {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetRole {
    Limb,
    Slice,
    BellyFlap(Side),
    Organ,
    TrayDrop,
    ToolPickup(ToolKind),
}

#[derive(Debug, Clone)]
pub struct Target {
    pub id: TargetId,
    pub role: TargetRole,
    pub required_tool: Option<ToolKind>,
    /// Position within the role's ordered sequence. `None` for unordered targets.
    pub ordinal: Option<usize>,
    pub label: String,
    pub description: Option<String>,
    pub animation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("scene is missing required targets: {}", missing.join(", "))]
pub struct MissingTargets {
    pub missing: Vec<String>,
}

/// Immutable lookup of every interactive target a procedure knows about.
#[derive(Debug, Default, Clone)]
pub struct TargetRegistry {
    targets: Vec<Target>,
    index_by_id: HashMap<String, usize>,
}

impl TargetRegistry {
    pub(crate) fn from_targets(targets: Vec<Target>) -> Self {
        let index_by_id = targets
            .iter()
            .enumerate()
            .map(|(idx, target)| (target.id.0.clone(), idx))
            .collect();
        Self {
            targets,
            index_by_id,
        }
    }

    /// `None` means the object is decorative and must be ignored.
    pub fn lookup(&self, id: &str) -> Option<&Target> {
        self.index_by_id.get(id).map(|idx| &self.targets[*idx])
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Ordered targets for a sequenced role, sorted by ordinal.
    pub fn sequence(&self, role: TargetRole) -> Vec<TargetId> {
        let mut members = self
            .targets
            .iter()
            .filter(|target| target.role == role)
            .collect::<Vec<_>>();
        members.sort_by_key(|target| target.ordinal.unwrap_or(usize::MAX));
        members.into_iter().map(|target| target.id.clone()).collect()
    }

    pub fn limbs(&self) -> Vec<TargetId> {
        self.sequence(TargetRole::Limb)
    }

    pub fn slices(&self) -> Vec<TargetId> {
        self.sequence(TargetRole::Slice)
    }

    pub fn organs(&self) -> Vec<&Target> {
        self.targets
            .iter()
            .filter(|target| target.role == TargetRole::Organ)
            .collect()
    }

    pub fn belly_flap(&self, side: Side) -> Option<&Target> {
        self.targets
            .iter()
            .find(|target| target.role == TargetRole::BellyFlap(side))
    }

    /// Checks a loaded scene's mesh names against every target the procedure needs.
    /// Tool pickups are optional since tools can also be chosen from the UI.
    pub fn validate_scene<'a>(
        &self,
        mesh_names: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), MissingTargets> {
        let present = mesh_names
            .into_iter()
            .collect::<std::collections::HashSet<_>>();
        let missing = self
            .targets
            .iter()
            .filter(|target| !matches!(target.role, TargetRole::ToolPickup(_)))
            .filter(|target| !present.contains(target.id.as_str()))
            .map(|target| target.id.0.clone())
            .collect::<Vec<_>>();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingTargets { missing })
        }
    }
}
