//! The two-level command catalog.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use plfm_context::{ConfigContext, Field};
use serde::Deserialize;
use tracing::debug;

use crate::{CatalogError, ResolveError, Template, TemplateResolver};

/// The catalog document compiled into this crate.
pub const BUILTIN_CATALOG: &str = include_str!("../catalog.toml");

static BUILTIN: OnceLock<Result<CommandCatalog, CatalogError>> = OnceLock::new();

/// Raw document shape: resource -> action -> template text.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct RawCatalog(BTreeMap<String, BTreeMap<String, String>>);

/// A `resource:action` reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommandRef {
    pub resource: String,
    pub action: String,
}

impl CommandRef {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
        }
    }
}

impl fmt::Display for CommandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

impl FromStr for CommandRef {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((resource, action)) if !resource.is_empty() && !action.is_empty() => {
                Ok(Self::new(resource, action))
            }
            _ => Err(ResolveError::InvalidReference(s.to_string())),
        }
    }
}

/// A single catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct CatalogEntry<'a> {
    pub resource: &'a str,
    pub action: &'a str,
    pub template: &'a Template,
}

/// Counts produced by [`CommandCatalog::summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSummary {
    pub resources: usize,
    pub commands: usize,
    /// Fields referenced by at least one template.
    pub referenced_fields: BTreeSet<Field>,
}

/// Immutable mapping of resource -> action -> template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandCatalog {
    commands: BTreeMap<String, BTreeMap<String, Template>>,
}

impl CommandCatalog {
    /// The built-in catalog, parsed once per process.
    pub fn builtin() -> Result<&'static CommandCatalog, CatalogError> {
        BUILTIN
            .get_or_init(|| Self::from_toml_str(BUILTIN_CATALOG))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Load a catalog from a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog =
            toml::from_str(contents).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Load a catalog from a YAML document with the same shape.
    pub fn from_yaml_str(contents: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog =
            serde_yaml::from_str(contents).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Load a catalog file; `.yaml`/`.yml` are parsed as YAML, anything else
    /// as TOML.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            _ => Self::from_toml_str(&contents),
        }
    }

    fn from_raw(raw: RawCatalog) -> Result<Self, CatalogError> {
        let mut commands = BTreeMap::new();

        for (resource, actions) in raw.0 {
            validate_name("resource", &resource)?;
            let mut parsed = BTreeMap::new();
            for (action, source) in actions {
                validate_name("action", &action)?;
                let template =
                    Template::parse(&source).map_err(|err| CatalogError::InvalidTemplate {
                        resource: resource.clone(),
                        action: action.clone(),
                        source: err,
                    })?;
                parsed.insert(action, template);
            }
            commands.insert(resource, parsed);
        }

        let catalog = Self { commands };
        debug!(
            resources = catalog.commands.len(),
            commands = catalog.len(),
            "command catalog loaded"
        );
        Ok(catalog)
    }

    /// Look up the template for (resource, action).
    pub fn lookup(&self, resource: &str, action: &str) -> Result<&Template, ResolveError> {
        self.commands
            .get(resource)
            .and_then(|actions| actions.get(action))
            .ok_or_else(|| ResolveError::UnknownCommand {
                resource: resource.to_string(),
                action: action.to_string(),
            })
    }

    /// Resolve (resource, action) against `context`, joining lists with `,`.
    pub fn resolve(
        &self,
        resource: &str,
        action: &str,
        context: &ConfigContext,
    ) -> Result<String, ResolveError> {
        self.resolve_with(&TemplateResolver::default(), resource, action, context)
    }

    /// Resolve (resource, action) with an explicit resolver.
    pub fn resolve_with(
        &self,
        resolver: &TemplateResolver,
        resource: &str,
        action: &str,
        context: &ConfigContext,
    ) -> Result<String, ResolveError> {
        let template = self.lookup(resource, action)?;
        resolver.resolve(template, context)
    }

    /// Resolve a parsed `resource:action` reference.
    pub fn resolve_ref(
        &self,
        command: &CommandRef,
        context: &ConfigContext,
    ) -> Result<String, ResolveError> {
        self.resolve(&command.resource, &command.action, context)
    }

    /// Resource names, sorted.
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Every entry, sorted by resource then action.
    pub fn entries(&self) -> impl Iterator<Item = CatalogEntry<'_>> {
        self.commands.iter().flat_map(|(resource, actions)| {
            actions.iter().map(move |(action, template)| CatalogEntry {
                resource,
                action,
                template,
            })
        })
    }

    /// Number of (resource, action) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.values().map(BTreeMap::len).sum()
    }

    /// Returns true if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Static overview of what the catalog references.
    #[must_use]
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            resources: self.commands.len(),
            commands: self.len(),
            referenced_fields: self
                .entries()
                .flat_map(|entry| entry.template.fields())
                .collect(),
        }
    }
}

fn validate_name(kind: &'static str, name: &str) -> Result<(), CatalogError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(CatalogError::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use plfm_context::FieldValue;

    use super::*;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = CommandCatalog::builtin().unwrap();
        assert!(catalog.len() > 30);
        assert!(catalog.lookup("releases", "rollback").is_ok());
        assert!(std::ptr::eq(catalog, CommandCatalog::builtin().unwrap()));
    }

    #[test]
    fn every_builtin_template_resolves_with_its_fields_set() {
        let catalog = CommandCatalog::builtin().unwrap();
        let mut ctx = ConfigContext::with_defaults();
        ctx.set(Field::CustomDomain, "sample.example.com");

        for entry in catalog.entries() {
            let resolved = catalog
                .resolve(entry.resource, entry.action, &ctx)
                .unwrap_or_else(|e| panic!("{}:{}: {e}", entry.resource, entry.action));
            assert!(!resolved.contains("{{"), "{resolved}");
        }
    }

    #[test]
    fn every_builtin_placeholder_fails_when_unset() {
        let catalog = CommandCatalog::builtin().unwrap();
        let mut full = ConfigContext::with_defaults();
        full.set(Field::CustomDomain, "sample.example.com");

        for entry in catalog.entries() {
            for field in entry.template.fields() {
                let mut ctx = ConfigContext::new();
                for (f, v) in full.iter().filter(|(f, _)| *f != field) {
                    ctx.set(f, v.clone());
                }
                let err = catalog
                    .resolve(entry.resource, entry.action, &ctx)
                    .unwrap_err();
                assert_eq!(err.missing_field(), Some(field));
            }
        }
    }

    #[test]
    fn rollback_renders_app_and_version() {
        let catalog = CommandCatalog::builtin().unwrap();
        let mut ctx = ConfigContext::new();
        ctx.set(Field::AppName, "sample");
        ctx.set(Field::Version, "3");

        let cmd = catalog.resolve("releases", "rollback", &ctx).unwrap();
        assert_eq!(cmd, "vt releases rollback v3 --app=sample");
    }

    #[test]
    fn unknown_command() {
        let catalog = CommandCatalog::builtin().unwrap();
        let ctx = ConfigContext::with_defaults();
        assert_eq!(
            catalog.resolve("releases", "promote", &ctx).unwrap_err(),
            ResolveError::UnknownCommand {
                resource: "releases".to_string(),
                action: "promote".to_string()
            }
        );
        assert!(matches!(
            catalog.resolve("nodes", "list", &ctx),
            Err(ResolveError::UnknownCommand { .. })
        ));
    }

    #[test]
    fn unknown_placeholder_rejected_at_load() {
        let err = CommandCatalog::from_toml_str(
            r#"
[apps]
create = "vt apps create {{application}}"
"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidTemplate { ref resource, ref action, .. }
                if resource == "apps" && action == "create"
        ));
    }

    #[test]
    fn invalid_names_rejected() {
        let err = CommandCatalog::from_toml_str("[Apps]\nlist = \"vt apps list\"\n").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidName { kind: "resource", .. }));
    }

    #[test]
    fn top_level_string_is_not_a_catalog() {
        let err = CommandCatalog::from_toml_str("list = \"vt apps list\"\n").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn non_text_templates_are_rejected() {
        let err = CommandCatalog::from_toml_str("[ps]\nscale = 3\n").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));

        let err = CommandCatalog::from_yaml_str("ps:\n  scale: [vt, ps, scale]\n").unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)));
    }

    #[test]
    fn yaml_documents_load_from_path() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "releases:\n  list: \"vt releases list --app={{{{app_name}}}}\"\n"
        )
        .unwrap();

        let catalog = CommandCatalog::from_path(file.path()).unwrap();
        let mut ctx = ConfigContext::new();
        ctx.set(Field::AppName, FieldValue::from("sample"));
        assert_eq!(
            catalog.resolve("releases", "list", &ctx).unwrap(),
            "vt releases list --app=sample"
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CommandCatalog::from_path(Path::new("/nonexistent/catalog.toml")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[test]
    fn command_ref_parsing() {
        let r: CommandRef = "releases:rollback".parse().unwrap();
        assert_eq!(r, CommandRef::new("releases", "rollback"));
        assert_eq!(r.to_string(), "releases:rollback");
        assert!("releases".parse::<CommandRef>().is_err());
        assert!(":list".parse::<CommandRef>().is_err());
    }

    #[test]
    fn summary_counts() {
        let catalog = CommandCatalog::from_toml_str(
            r#"
[apps]
list = "vt apps list"
info = "vt apps info --app={{app_name}}"

[releases]
info = "vt releases info v{{version}} --app={{app_name}}"
"#,
        )
        .unwrap();
        let summary = catalog.summary();
        assert_eq!(summary.resources, 2);
        assert_eq!(summary.commands, 3);
        assert_eq!(
            summary.referenced_fields.into_iter().collect::<Vec<_>>(),
            vec![Field::AppName, Field::Version]
        );
    }
}
