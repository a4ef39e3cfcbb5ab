//! The per-scenario context record.

use std::collections::BTreeMap;

use crate::{ContextError, Field, FieldKind, FieldValue};

/// Prefix for environment variables overriding field defaults.
pub const ENV_PREFIX: &str = "PLFM_ITEST_";

/// Scenario-local variables, keyed by [`Field`].
///
/// Owned by a single scenario. Steps read it to render commands and write
/// derived values (a created app's name, an assigned release version) back
/// into it for later steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigContext {
    values: BTreeMap<Field, FieldValue>,
}

impl ConfigContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context holding only the built-in defaults.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut ctx = Self::new();
        for field in Field::ALL {
            if let Some(raw) = field.default_raw() {
                // Built-in defaults are valid for their kind.
                if let Ok(value) = FieldValue::parse(*field, raw) {
                    ctx.values.insert(*field, value);
                }
            }
        }
        ctx
    }

    /// Built-in defaults overridden by `PLFM_ITEST_*` environment variables.
    pub fn from_env() -> Result<Self, ContextError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Built-in defaults overridden by whatever `lookup` returns for each
    /// field's environment variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ContextError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut ctx = Self::with_defaults();
        for field in Field::ALL {
            if let Some(raw) = lookup(&field.env_var()) {
                ctx.set_raw(*field, &raw)?;
            }
        }
        Ok(ctx)
    }

    /// Parse a TOML document of `field = value` pairs.
    ///
    /// Strings are interpreted by the field's kind, so `version = "4"` and
    /// `version = 4` are equivalent. Native integers and arrays are only
    /// accepted for integer and list fields respectively.
    pub fn from_toml_str(contents: &str) -> Result<Self, ContextError> {
        let table: toml::Table =
            toml::from_str(contents).map_err(|e| ContextError::Parse(e.to_string()))?;

        let mut ctx = Self::new();
        for (key, value) in table {
            let field: Field = key.parse()?;
            let value = match (field.kind(), value) {
                (_, toml::Value::String(s)) => FieldValue::parse(field, &s)?,
                (FieldKind::Integer, toml::Value::Integer(n)) => FieldValue::Integer(n),
                (FieldKind::List, toml::Value::Array(items)) => FieldValue::List(
                    items
                        .into_iter()
                        .map(|item| match item {
                            toml::Value::String(s) => Ok(s),
                            other => Err(ContextError::InvalidValue {
                                field: field.name().to_string(),
                                value: other.to_string(),
                                reason: "list items must be strings".to_string(),
                            }),
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                (kind, other) => {
                    let expected = match kind {
                        FieldKind::Text => "a string",
                        FieldKind::Integer => "an integer or a string",
                        FieldKind::List => "a list of strings or a string",
                    };
                    return Err(ContextError::InvalidValue {
                        field: field.name().to_string(),
                        value: other.to_string(),
                        reason: format!("{} field expects {expected}", kind.label()),
                    });
                }
            };
            ctx.values.insert(field, value);
        }
        Ok(ctx)
    }

    /// Get a field's value, if set.
    #[must_use]
    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// Check if a field is set.
    #[must_use]
    pub fn is_set(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    /// Set a field, returning the previous value.
    pub fn set(&mut self, field: Field, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.values.insert(field, value.into())
    }

    /// Set a field from raw text, interpreted by the field's kind.
    pub fn set_raw(&mut self, field: Field, raw: &str) -> Result<(), ContextError> {
        let value = FieldValue::parse(field, raw)?;
        self.values.insert(field, value);
        Ok(())
    }

    /// Apply a `field=value` assignment.
    pub fn apply_assignment(&mut self, assignment: &str) -> Result<Field, ContextError> {
        let Some((name, raw)) = assignment.split_once('=') else {
            return Err(ContextError::InvalidAssignment(assignment.to_string()));
        };
        let field: Field = name.parse()?;
        self.set_raw(field, raw)?;
        Ok(field)
    }

    /// Copy every value set in `other` into this context.
    pub fn overlay(&mut self, other: &ConfigContext) {
        for (field, value) in &other.values {
            self.values.insert(*field, value.clone());
        }
    }

    /// Iterate over set fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.values.iter().map(|(field, value)| (*field, value))
    }

    /// Number of set fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
