use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};

use crate::procedure::ToolKind;

use super::database::{Side, Target, TargetId, TargetRegistry, TargetRole};

const BUILTIN_PROCEDURE_XML: &str =
    include_str!("../../../../assets/procedures/frog_dissection.xml");
const BUILTIN_PATH_LABEL: &str = "<builtin>/frog_dissection.xml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    ReadFile,
    XmlMalformed,
    InvalidRoot,
    UnknownSection,
    UnknownField,
    DuplicateField,
    MissingField,
    InvalidValue,
    DuplicateTarget,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub code: ConfigErrorCode,
    pub message: String,
    pub file_path: PathBuf,
    pub location: Option<SourceLocation>,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(
                f,
                "{:?}: {} (file={}, line={}, column={})",
                self.code,
                self.message,
                self.file_path.display(),
                loc.line,
                loc.column
            ),
            None => write!(
                f,
                "{:?}: {} (file={})",
                self.code,
                self.message,
                self.file_path.display()
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub text: String,
    pub image: Option<String>,
}

/// A fully validated procedure: the target registry plus the instruction script.
#[derive(Debug, Clone)]
pub struct ProcedureDef {
    pub name: String,
    pub registry: TargetRegistry,
    pub instructions: Vec<Instruction>,
}

impl ProcedureDef {
    /// The frog dissection shipped with the trainer.
    pub fn builtin() -> Self {
        compile_procedure(BUILTIN_PROCEDURE_XML, Path::new(BUILTIN_PATH_LABEL))
            .expect("built-in procedure definition should compile")
    }

    pub fn instruction_texts(&self) -> Vec<String> {
        self.instructions
            .iter()
            .map(|instruction| instruction.text.clone())
            .collect()
    }
}

pub fn load_procedure_file(path: &Path) -> Result<ProcedureDef, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError {
        code: ConfigErrorCode::ReadFile,
        message: format!("failed to read procedure file: {source}"),
        file_path: path.to_path_buf(),
        location: None,
    })?;
    compile_procedure(&raw, path)
}

pub fn compile_procedure(raw: &str, file_path: &Path) -> Result<ProcedureDef, ConfigError> {
    let doc = Document::parse(raw).map_err(|error| ConfigError {
        code: ConfigErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        file_path: file_path.to_path_buf(),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })?;
    let ctx = Ctx {
        file_path,
        doc: &doc,
    };

    let root = doc.root_element();
    if root.tag_name().name() != "Procedure" {
        return Err(ctx.error_at(
            ConfigErrorCode::InvalidRoot,
            "root element must be <Procedure>".to_string(),
            root,
        ));
    }
    let name = ctx.required_attr(root, "name")?;

    let mut seen_sections = HashSet::<String>::new();
    let mut seen_ids = HashSet::<String>::new();
    let mut targets = Vec::<Target>::new();
    let mut instructions: Option<Vec<Instruction>> = None;

    for section in root.children().filter(|node| node.is_element()) {
        let section_name = section.tag_name().name().to_string();
        if !seen_sections.insert(section_name.clone()) {
            return Err(ctx.error_at(
                ConfigErrorCode::DuplicateField,
                format!("duplicate section <{}> in <Procedure>", section_name),
                section,
            ));
        }

        let parsed = match section_name.as_str() {
            "Limbs" => ctx.parse_ordered_section(section, TargetRole::Limb)?,
            "Slices" => ctx.parse_ordered_section(section, TargetRole::Slice)?,
            "BellyFlaps" => ctx.parse_belly_flaps(section)?,
            "Organs" => ctx.parse_plain_section(section, TargetRole::Organ)?,
            "TrayDrops" => ctx.parse_plain_section(section, TargetRole::TrayDrop)?,
            "ToolPickups" => ctx.parse_tool_pickups(section)?,
            "Instructions" => {
                instructions = Some(ctx.parse_instructions(section)?);
                Vec::new()
            }
            _ => {
                return Err(ctx.error_at(
                    ConfigErrorCode::UnknownSection,
                    format!("unknown section <{}> in <Procedure>", section_name),
                    section,
                ))
            }
        };

        for (target, node) in parsed {
            if !seen_ids.insert(target.id.0.clone()) {
                return Err(ctx.error_at(
                    ConfigErrorCode::DuplicateTarget,
                    format!("target '{}' is declared more than once", target.id),
                    node,
                ));
            }
            targets.push(target);
        }
    }

    for required in ["Limbs", "Slices", "BellyFlaps", "Organs", "TrayDrops"] {
        if !seen_sections.contains(required) {
            return Err(ctx.error_at(
                ConfigErrorCode::MissingField,
                format!("missing required section <{}> in <Procedure>", required),
                root,
            ));
        }
    }
    let Some(instructions) = instructions else {
        return Err(ctx.error_at(
            ConfigErrorCode::MissingField,
            "missing required section <Instructions> in <Procedure>".to_string(),
            root,
        ));
    };

    let registry = TargetRegistry::from_targets(targets);
    for side in [Side::Left, Side::Right] {
        if registry.belly_flap(side).is_none() {
            return Err(ctx.error_at(
                ConfigErrorCode::MissingField,
                format!("<BellyFlaps> must declare a {} flap", side.as_token()),
                root,
            ));
        }
    }
    for (role, section) in [
        (TargetRole::Limb, "Limbs"),
        (TargetRole::Slice, "Slices"),
        (TargetRole::Organ, "Organs"),
        (TargetRole::TrayDrop, "TrayDrops"),
    ] {
        if registry.sequence(role).is_empty() {
            return Err(ctx.error_at(
                ConfigErrorCode::MissingField,
                format!("<{}> must declare at least one <Target>", section),
                root,
            ));
        }
    }

    // One step per limb and per slice, then belly opening, organ removal and completion.
    let expected_steps = registry.limbs().len() + registry.slices().len() + 3;
    if instructions.len() != expected_steps {
        return Err(ctx.error_at(
            ConfigErrorCode::InvalidValue,
            format!(
                "<Instructions> must contain {} <Step> entries, found {}",
                expected_steps,
                instructions.len()
            ),
            root,
        ));
    }

    Ok(ProcedureDef {
        name,
        registry,
        instructions,
    })
}

struct Ctx<'a, 'input> {
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

type ParsedTargets<'a, 'input> = Vec<(Target, Node<'a, 'input>)>;

impl<'a, 'input> Ctx<'a, 'input> {
    fn parse_ordered_section(
        &self,
        section: Node<'a, 'input>,
        role: TargetRole,
    ) -> Result<ParsedTargets<'a, 'input>, ConfigError> {
        let tool = self.tool_attr(section)?;
        let mut parsed = Vec::new();
        for (ordinal, node) in self.target_nodes(section)?.into_iter().enumerate() {
            let mut target = self.base_target(node, role)?;
            target.required_tool = Some(tool);
            target.ordinal = Some(ordinal);
            parsed.push((target, node));
        }
        Ok(parsed)
    }

    fn parse_plain_section(
        &self,
        section: Node<'a, 'input>,
        role: TargetRole,
    ) -> Result<ParsedTargets<'a, 'input>, ConfigError> {
        let mut parsed = Vec::new();
        for node in self.target_nodes(section)? {
            let mut target = self.base_target(node, role)?;
            target.description = node
                .text()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(ToString::to_string);
            parsed.push((target, node));
        }
        Ok(parsed)
    }

    fn parse_belly_flaps(
        &self,
        section: Node<'a, 'input>,
    ) -> Result<ParsedTargets<'a, 'input>, ConfigError> {
        let tool = self.tool_attr(section)?;
        let mut parsed = Vec::new();
        for node in self.target_nodes(section)? {
            let raw_side = self.required_attr(node, "side")?;
            let Some(side) = Side::from_token(&raw_side) else {
                return Err(self.error_at(
                    ConfigErrorCode::InvalidValue,
                    format!("invalid side '{}'; allowed values: left, right", raw_side),
                    node,
                ));
            };
            let mut target = self.base_target(node, TargetRole::BellyFlap(side))?;
            target.required_tool = Some(tool);
            target.animation = Some(self.required_attr(node, "animation")?);
            parsed.push((target, node));
        }
        Ok(parsed)
    }

    fn parse_tool_pickups(
        &self,
        section: Node<'a, 'input>,
    ) -> Result<ParsedTargets<'a, 'input>, ConfigError> {
        let mut parsed = Vec::new();
        for node in self.target_nodes(section)? {
            let tool = self.tool_attr(node)?;
            let target = self.base_target(node, TargetRole::ToolPickup(tool))?;
            parsed.push((target, node));
        }
        Ok(parsed)
    }

    fn parse_instructions(&self, section: Node<'a, 'input>) -> Result<Vec<Instruction>, ConfigError> {
        let mut steps = Vec::new();
        for node in section.children().filter(|child| child.is_element()) {
            if node.tag_name().name() != "Step" {
                return Err(self.error_at(
                    ConfigErrorCode::UnknownField,
                    format!(
                        "unknown element <{}> in <Instructions>; expected <Step>",
                        node.tag_name().name()
                    ),
                    node,
                ));
            }
            let text = node.text().map(str::trim).unwrap_or_default().to_string();
            if text.is_empty() {
                return Err(self.error_at(
                    ConfigErrorCode::MissingField,
                    "<Step> text must not be empty".to_string(),
                    node,
                ));
            }
            steps.push(Instruction {
                text,
                image: node.attribute("image").map(ToString::to_string),
            });
        }
        Ok(steps)
    }

    fn target_nodes(&self, section: Node<'a, 'input>) -> Result<Vec<Node<'a, 'input>>, ConfigError> {
        let mut nodes = Vec::new();
        for node in section.children().filter(|child| child.is_element()) {
            if node.tag_name().name() != "Target" {
                return Err(self.error_at(
                    ConfigErrorCode::UnknownField,
                    format!(
                        "unknown element <{}> in <{}>; expected <Target>",
                        node.tag_name().name(),
                        section.tag_name().name()
                    ),
                    node,
                ));
            }
            nodes.push(node);
        }
        Ok(nodes)
    }

    fn base_target(&self, node: Node<'a, 'input>, role: TargetRole) -> Result<Target, ConfigError> {
        let id = self.required_attr(node, "id")?;
        let label = node
            .attribute("label")
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(ToString::to_string)
            .unwrap_or_else(|| id.clone());
        Ok(Target {
            id: TargetId(id),
            role,
            required_tool: None,
            ordinal: None,
            label,
            description: None,
            animation: None,
        })
    }

    fn tool_attr(&self, node: Node<'a, 'input>) -> Result<ToolKind, ConfigError> {
        let raw = self.required_attr(node, "tool")?;
        match ToolKind::from_token(&raw) {
            Some(ToolKind::None) | None => Err(self.error_at(
                ConfigErrorCode::InvalidValue,
                format!(
                    "invalid tool '{}'; allowed values: Pins, Scissors, Forceps, Scalpel",
                    raw
                ),
                node,
            )),
            Some(tool) => Ok(tool),
        }
    }

    fn required_attr(&self, node: Node<'a, 'input>, attr: &str) -> Result<String, ConfigError> {
        let value = node.attribute(attr).map(str::trim).unwrap_or_default();
        if value.is_empty() {
            return Err(self.error_at(
                ConfigErrorCode::MissingField,
                format!(
                    "missing required attribute '{}' on <{}>",
                    attr,
                    node.tag_name().name()
                ),
                node,
            ));
        }
        Ok(value.to_string())
    }

    fn error_at(&self, code: ConfigErrorCode, message: String, node: Node<'_, '_>) -> ConfigError {
        let pos = self.doc.text_pos_at(node.range().start);
        ConfigError {
            code,
            message,
            file_path: self.file_path.to_path_buf(),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }
}
