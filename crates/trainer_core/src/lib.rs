use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod catalog;
pub mod procedure;
pub mod registry;

pub use catalog::{organ_entries, Carousel, InsectInfo, OrganEntry, SpecimenCatalog};
pub use procedure::{
    ClickOutcome, Cue, DissectionMachine, DissectionPhase, FeedbackEmitter, FeedbackEvent, Flow,
    Hit, MarkOutcome, MarkerTracker, Outcome, Picking, PinOutcome, Popup, Presentation,
    PreservationMachine, PreservationPhase, SceneCommand, SceneSink, Session, SpecimenError,
    ToolKind, ToolSelector,
};
pub use registry::{
    compile_procedure, load_procedure_file, ConfigError, ConfigErrorCode, Instruction,
    ProcedureDef, Side, SourceLocation, Target, TargetId, TargetRegistry, TargetRole,
};

pub const ROOT_ENV_VAR: &str = "TRAINER_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub procedures_dir: PathBuf,
    pub specimens_dir: PathBuf,
}

impl AppPaths {
    pub fn default_procedure_file(&self) -> PathBuf {
        self.procedures_dir.join("frog_dissection.xml")
    }

    pub fn default_catalog_file(&self) -> PathBuf {
        self.specimens_dir.join("insects.json")
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "TRAINER_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and assets/.\n\
Set {env_var} explicitly, for example:\n\
export {env_var}=\"/path/to/trainer\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(app_paths_at(root))
}

fn app_paths_at(root: PathBuf) -> AppPaths {
    let assets = root.join("assets");
    AppPaths {
        procedures_dir: assets.join("procedures"),
        specimens_dir: assets.join("specimens"),
        root,
    }
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(&PathBuf::from(value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            exe_dir
                .ancestors()
                .find(|candidate| is_repo_marker(candidate))
                .map(normalize_path)
                .ok_or_else(|| StartupError::RootNotFound {
                    start_dir: normalize_path(&exe_dir),
                    env_var: ROOT_ENV_VAR,
                })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
