use std::fs;
use std::path::{Path, PathBuf};

use trainer_core::{load_procedure_file, resolve_app_paths, ProcedureDef, SpecimenCatalog};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub(crate) const PROCEDURE_FILE_ENV_VAR: &str = "TRAINER_PROCEDURE_FILE";
pub(crate) const CATALOG_FILE_ENV_VAR: &str = "TRAINER_CATALOG_FILE";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StartupOverrides {
    pub(crate) procedure_file: Option<PathBuf>,
    pub(crate) catalog_file: Option<PathBuf>,
}

pub(crate) struct AppWiring {
    pub(crate) definition: ProcedureDef,
    pub(crate) catalog: SpecimenCatalog,
}

pub(crate) fn build_app(overrides: StartupOverrides) -> Result<AppWiring, String> {
    init_tracing();
    info!("=== Procedure Trainer Startup ===");

    let definition = load_definition(overrides.procedure_file)?;
    let catalog = load_catalog(overrides.catalog_file)?;
    info!(
        procedure = %definition.name,
        targets = definition.registry.len(),
        steps = definition.instructions.len(),
        insects = catalog.insects.len(),
        "startup_complete"
    );
    Ok(AppWiring {
        definition,
        catalog,
    })
}

/// Logs go to stderr so stdout carries nothing but the transcript.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// An explicit file (flag, then env var) must load; otherwise the asset
/// under the project root is tried before the compiled-in definition.
fn load_definition(explicit: Option<PathBuf>) -> Result<ProcedureDef, String> {
    if let Some(path) = explicit.or_else(|| path_from_env(PROCEDURE_FILE_ENV_VAR)) {
        let definition = load_procedure_file(&path).map_err(|error| error.to_string())?;
        info!(path = %path.display(), "procedure_loaded");
        return Ok(definition);
    }

    match resolve_app_paths() {
        Ok(paths) if paths.default_procedure_file().is_file() => {
            let path = paths.default_procedure_file();
            let definition = load_procedure_file(&path).map_err(|error| error.to_string())?;
            info!(path = %path.display(), "procedure_loaded");
            Ok(definition)
        }
        Ok(_) => Ok(ProcedureDef::builtin()),
        Err(error) => {
            warn!(error = %error, "project_root_unresolved_using_builtin_procedure");
            Ok(ProcedureDef::builtin())
        }
    }
}

fn load_catalog(explicit: Option<PathBuf>) -> Result<SpecimenCatalog, String> {
    if let Some(path) = explicit.or_else(|| path_from_env(CATALOG_FILE_ENV_VAR)) {
        return read_catalog_file(&path);
    }

    match resolve_app_paths() {
        Ok(paths) if paths.default_catalog_file().is_file() => {
            read_catalog_file(&paths.default_catalog_file())
        }
        Ok(_) => Ok(SpecimenCatalog::builtin()),
        Err(error) => {
            warn!(error = %error, "project_root_unresolved_using_builtin_catalog");
            Ok(SpecimenCatalog::builtin())
        }
    }
}

fn path_from_env(var: &str) -> Option<PathBuf> {
    std::env::var(var)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

pub(crate) fn read_catalog_file(path: &Path) -> Result<SpecimenCatalog, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read catalog '{}': {error}", path.display()))?;
    let catalog = parse_catalog_json(&raw)
        .map_err(|error| format!("{error} (in '{}')", path.display()))?;
    info!(path = %path.display(), insects = catalog.insects.len(), "catalog_loaded");
    Ok(catalog)
}

pub(crate) fn parse_catalog_json(raw: &str) -> Result<SpecimenCatalog, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let catalog = match serde_path_to_error::deserialize::<_, SpecimenCatalog>(&mut deserializer) {
        Ok(catalog) => catalog,
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            return if path.is_empty() || path == "." {
                Err(format!("parse catalog json: {source}"))
            } else {
                Err(format!("parse catalog json at {path}: {source}"))
            };
        }
    };
    validate_catalog(&catalog)?;
    Ok(catalog)
}

/// Rejects entries that could never be loaded as a preservation specimen.
fn validate_catalog(catalog: &SpecimenCatalog) -> Result<(), String> {
    if catalog.helper_prefix.is_empty() {
        return Err("validation failed at helper_prefix: must not be empty".to_string());
    }
    let mut seen_keys: Vec<&str> = Vec::with_capacity(catalog.insects.len());
    for (index, insect) in catalog.insects.iter().enumerate() {
        if seen_keys.contains(&insect.key.as_str()) {
            return Err(format!(
                "validation failed at insects[{index}].key: duplicate key '{}'",
                insect.key
            ));
        }
        seen_keys.push(insect.key.as_str());
        if insect.helpers.is_empty() {
            return Err(format!(
                "validation failed at insects[{index}].helpers: expected at least one helper"
            ));
        }
        if let Some(bad) = insect
            .helpers
            .iter()
            .find(|helper| !helper.as_str().starts_with(&catalog.helper_prefix))
        {
            return Err(format!(
                "validation failed at insects[{index}].helpers: '{bad}' does not start with '{}'",
                catalog.helper_prefix
            ));
        }
    }
    Ok(())
}
