//! Context field names and values.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::ContextError;

/// How raw text for a field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free-form text.
    Text,
    /// Signed decimal integer.
    Integer,
    /// Comma-separated list of strings.
    List,
}

impl FieldKind {
    /// Lower-case label for display.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::List => "list",
        }
    }
}

/// Declares the fixed field set.
///
/// Each entry yields a variant, its template name, its kind, and the raw
/// built-in default (if any).
macro_rules! define_fields {
    ($( $(#[$doc:meta])* $variant:ident => $name:literal, $kind:ident, $default:expr; )*) => {
        /// A named slot in a [`ConfigContext`](crate::ConfigContext).
        ///
        /// Template placeholders may only reference these names.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Field {
            $( $(#[$doc])* $variant, )*
        }

        impl Field {
            /// Every known field, in declaration order.
            pub const ALL: &'static [Field] = &[ $( Field::$variant, )* ];

            /// The name used in templates and documents.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $( Field::$variant => $name, )*
                }
            }

            /// The kind used when parsing raw text for this field.
            #[must_use]
            pub const fn kind(self) -> FieldKind {
                match self {
                    $( Field::$variant => FieldKind::$kind, )*
                }
            }

            /// Built-in default, in raw text form.
            #[must_use]
            pub const fn default_raw(self) -> Option<&'static str> {
                match self {
                    $( Field::$variant => $default, )*
                }
            }
        }
    };
}

define_fields! {
    /// Name of the SSH key registered with the platform.
    AuthKey => "auth_key", Text, Some("itest");
    /// Cluster member hosts.
    Hosts => "hosts", List, Some("172.17.8.100");
    /// Base domain for the cluster.
    Domain => "domain", Text, Some("local.plfm.test");
    /// Private key used by the platform to reach cluster hosts.
    SshKey => "ssh_key", Text, Some("~/.ssh/id_rsa");
    ClusterName => "cluster_name", Text, Some("dev");
    UserName => "user_name", Text, Some("test");
    Password => "password", Text, Some("asdf1234");
    Email => "email", Text, Some("test@example.com");
    /// Repository name of the sample application to clone and push.
    ExampleApp => "example_app", Text, Some("example-go");
    AppName => "app_name", Text, Some("sample");
    /// Desired `web` process count.
    ProcessNum => "process_num", Integer, Some("2");
    ImageId => "image_id", Text, Some("busybox");
    /// Release version number (without the `v` prefix).
    Version => "version", Integer, Some("2");
    /// Second user granted or revoked app permissions.
    AppUser => "app_user", Text, Some("test1");
    MemoryLimit => "memory_limit", Text, Some("256M");
    CpuLimit => "cpu_limit", Text, Some("512");
    ConfigKey => "config_key", Text, Some("POWERED_BY");
    ConfigValue => "config_value", Text, Some("itest");
    CustomDomain => "custom_domain", Text, None;
}

impl Field {
    /// Environment variable overriding this field's default.
    #[must_use]
    pub fn env_var(self) -> String {
        format!("{}{}", crate::ENV_PREFIX, self.name().to_ascii_uppercase())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = ContextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| ContextError::UnknownField(s.to_string()))
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

/// A value held by a context field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    List(Vec<String>),
}

impl FieldValue {
    /// Parse raw text according to a field's kind.
    pub fn parse(field: Field, raw: &str) -> Result<Self, ContextError> {
        match field.kind() {
            FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|e| ContextError::InvalidValue {
                    field: field.name().to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                }),
            FieldKind::List => Ok(FieldValue::List(
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect(),
            )),
        }
    }

    /// Textual form substituted into templates.
    ///
    /// Lists are joined with `list_separator`; nothing else is formatted.
    #[must_use]
    pub fn render(&self, list_separator: &str) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::List(items) => items.join(list_separator),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(value: Vec<&str>) -> Self {
        FieldValue::List(value.into_iter().map(str::to_string).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_roundtrip() {
        for field in Field::ALL {
            let parsed: Field = field.name().parse().unwrap();
            assert_eq!(parsed, *field);
        }
    }

    #[test]
    fn field_names_are_unique() {
        let mut names: Vec<_> = Field::ALL.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Field::ALL.len());
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = "appname".parse::<Field>().unwrap_err();
        assert!(err.is_unknown_field());
    }

    #[test]
    fn env_var_uses_prefix() {
        assert_eq!(Field::AppName.env_var(), "PLFM_ITEST_APP_NAME");
    }

    #[test]
    fn parse_by_kind() {
        assert_eq!(
            FieldValue::parse(Field::Version, " 4 ").unwrap(),
            FieldValue::Integer(4)
        );
        assert_eq!(
            FieldValue::parse(Field::Hosts, "10.0.0.1, 10.0.0.2,").unwrap(),
            FieldValue::List(vec!["10.0.0.1".to_string(), "10.0.0.2".to_string()])
        );
        assert!(FieldValue::parse(Field::ProcessNum, "three").is_err());
    }

    #[test]
    fn render_lists_with_separator() {
        let hosts = FieldValue::from(vec!["a", "b", "c"]);
        assert_eq!(hosts.render(","), "a,b,c");
        assert_eq!(hosts.render(" "), "a b c");
        assert_eq!(FieldValue::from(3).render(","), "3");
    }

    #[test]
    fn values_serialize_untagged() {
        let json = serde_json::to_value(FieldValue::from(vec!["x"])).unwrap();
        assert_eq!(json, serde_json::json!(["x"]));
        let json = serde_json::to_value(FieldValue::from(7)).unwrap();
        assert_eq!(json, serde_json::json!(7));
    }
}
