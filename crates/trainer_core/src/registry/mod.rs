mod compiler;
mod database;

pub use compiler::{
    compile_procedure, load_procedure_file, ConfigError, ConfigErrorCode, Instruction,
    ProcedureDef, SourceLocation,
};
pub use database::{MissingTargets, Side, Target, TargetId, TargetRegistry, TargetRole};
