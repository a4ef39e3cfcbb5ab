//! Template parsing.

use std::fmt;

use plfm_context::Field;

use crate::TemplateError;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Literal(String),
    Placeholder(Field),
}

/// A parsed command template.
///
/// Parsing resolves every placeholder to a [`Field`], so a `Template` can
/// only fail to render because a field is unset, never because a name is
/// unknown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse a template string.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut offset = 0;

        while let Some(start) = rest.find(OPEN) {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }

            let after_open = &rest[start + OPEN.len()..];
            let Some(end) = after_open.find(CLOSE) else {
                return Err(TemplateError::Unterminated {
                    offset: offset + start,
                });
            };

            let name = after_open[..end].trim();
            if name.is_empty() {
                return Err(TemplateError::Empty {
                    offset: offset + start,
                });
            }

            let field = name
                .parse::<Field>()
                .map_err(|_| TemplateError::UnknownField {
                    name: name.to_string(),
                    offset: offset + start,
                })?;
            segments.push(Segment::Placeholder(field));

            let consumed = start + OPEN.len() + end + CLOSE.len();
            rest = &rest[consumed..];
            offset += consumed;
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The unparsed template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Fields referenced by this template, in order of first appearance.
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        for segment in &self.segments {
            if let Segment::Placeholder(field) = segment {
                if !fields.contains(field) {
                    fields.push(*field);
                }
            }
        }
        fields
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals_and_placeholders() {
        let t = Template::parse("vt releases rollback v{{version}} --app={{ app_name }}").unwrap();
        assert_eq!(
            t.segments(),
            &[
                Segment::Literal("vt releases rollback v".to_string()),
                Segment::Placeholder(Field::Version),
                Segment::Literal(" --app=".to_string()),
                Segment::Placeholder(Field::AppName),
            ]
        );
        assert_eq!(t.fields(), vec![Field::Version, Field::AppName]);
    }

    #[test]
    fn template_without_placeholders() {
        let t = Template::parse("vt auth logout").unwrap();
        assert!(t.fields().is_empty());
        assert_eq!(t.to_string(), "vt auth logout");
    }

    #[test]
    fn repeated_placeholder_listed_once() {
        let t = Template::parse("vt apps destroy --app={{app_name}} --confirm={{app_name}}").unwrap();
        assert_eq!(t.fields(), vec![Field::AppName]);
    }

    #[test]
    fn unknown_placeholder_rejected() {
        let err = Template::parse("vt apps create {{appname}}").unwrap_err();
        assert_eq!(
            err,
            TemplateError::UnknownField {
                name: "appname".to_string(),
                offset: 15
            }
        );
    }

    #[test]
    fn unterminated_and_empty_rejected() {
        assert_eq!(
            Template::parse("echo {{app_name").unwrap_err(),
            TemplateError::Unterminated { offset: 5 }
        );
        assert_eq!(
            Template::parse("echo {{ }}").unwrap_err(),
            TemplateError::Empty { offset: 5 }
        );
    }

    #[test]
    fn stray_closing_braces_are_literal() {
        let t = Template::parse("echo }} {{app_name}}").unwrap();
        assert_eq!(t.fields(), vec![Field::AppName]);
    }
}
