//! Context and catalog loading.
//!
//! The context is layered, later layers winning:
//! - built-in defaults, overridden by `PLFM_ITEST_*` variables
//! - `context.toml` in the user config directory
//! - the file given with `--context`
//! - `--set field=value` flags

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use plfm_catalog::CommandCatalog;
use plfm_context::ConfigContext;
use tracing::debug;

/// Saved context file name.
const CONTEXT_FILE: &str = "context.toml";

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "plfm", "vt-itest")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// Build the effective context.
pub fn load_context(explicit: Option<&Path>, assignments: &[String]) -> Result<ConfigContext> {
    let saved = config_dir().ok().map(|dir| dir.join(CONTEXT_FILE));
    layer_context(saved.as_deref(), explicit, assignments)
}

fn layer_context(
    saved: Option<&Path>,
    explicit: Option<&Path>,
    assignments: &[String],
) -> Result<ConfigContext> {
    let mut ctx = ConfigContext::from_env().context("Invalid PLFM_ITEST_* environment value")?;

    if let Some(path) = saved.filter(|path| path.exists()) {
        ctx.overlay(&read_context_file(path)?);
    }

    if let Some(path) = explicit {
        ctx.overlay(&read_context_file(path)?);
    }

    for assignment in assignments {
        let field = ctx
            .apply_assignment(assignment)
            .with_context(|| format!("Invalid --set {assignment:?}"))?;
        debug!(field = %field, "context override");
    }

    Ok(ctx)
}

fn read_context_file(path: &Path) -> Result<ConfigContext> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read context from {:?}", path))?;
    let ctx = ConfigContext::from_toml_str(&contents)
        .with_context(|| format!("Failed to parse context from {:?}", path))?;
    debug!(path = %path.display(), fields = ctx.len(), "loaded context file");
    Ok(ctx)
}

/// The catalog to use: a document from disk, or the built-in one.
pub fn load_catalog(path: Option<&Path>) -> Result<Cow<'static, CommandCatalog>> {
    match path {
        Some(path) => Ok(Cow::Owned(
            CommandCatalog::from_path(path)
                .with_context(|| format!("Failed to load catalog {:?}", path))?,
        )),
        None => Ok(Cow::Borrowed(
            CommandCatalog::builtin().context("Built-in catalog is invalid")?,
        )),
    }
}
