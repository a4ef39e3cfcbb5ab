//! Placeholder substitution.

use plfm_context::ConfigContext;

use crate::template::Segment;
use crate::{ResolveError, Template};

/// Separator used for list-valued fields unless the caller picks another.
pub const DEFAULT_LIST_SEPARATOR: &str = ",";

/// Renders templates against a context.
///
/// The only formatting choice is how list-valued fields are joined.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    list_separator: String,
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self {
            list_separator: DEFAULT_LIST_SEPARATOR.to_string(),
        }
    }
}

impl TemplateResolver {
    /// Create a resolver joining lists with `,`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Join list-valued fields with `separator` instead.
    #[must_use]
    pub fn with_list_separator(mut self, separator: impl Into<String>) -> Self {
        self.list_separator = separator.into();
        self
    }

    /// Substitute every placeholder in `template` from `context`.
    ///
    /// Fails on the first placeholder whose field is unset.
    pub fn resolve(
        &self,
        template: &Template,
        context: &ConfigContext,
    ) -> Result<String, ResolveError> {
        let mut out = String::with_capacity(template.source().len());
        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(field) => {
                    let value = context.get(*field).ok_or_else(|| {
                        ResolveError::UnresolvedPlaceholder {
                            field: *field,
                            template: template.source().to_string(),
                        }
                    })?;
                    out.push_str(&value.render(&self.list_separator));
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use plfm_context::Field;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn substitutes_every_placeholder() {
        let template =
            Template::parse("vt clusters create {{cluster_name}} --hosts={{hosts}}").unwrap();
        let mut ctx = ConfigContext::new();
        ctx.set(Field::ClusterName, "dev");
        ctx.set(Field::Hosts, vec!["10.0.0.1", "10.0.0.2"]);

        let resolver = TemplateResolver::new();
        assert_eq!(
            resolver.resolve(&template, &ctx).unwrap(),
            "vt clusters create dev --hosts=10.0.0.1,10.0.0.2"
        );

        let spaced = TemplateResolver::new().with_list_separator(" ");
        assert_eq!(
            spaced.resolve(&template, &ctx).unwrap(),
            "vt clusters create dev --hosts=10.0.0.1 10.0.0.2"
        );
    }

    #[test]
    fn unset_field_is_an_error_not_an_empty_string() {
        let template = Template::parse("vt domains add {{custom_domain}}").unwrap();
        let ctx = ConfigContext::with_defaults();

        let err = TemplateResolver::new()
            .resolve(&template, &ctx)
            .unwrap_err();
        assert_eq!(err.missing_field(), Some(Field::CustomDomain));
    }

    #[test]
    fn resolution_does_not_touch_the_context() {
        let template = Template::parse("echo {{app_name}}").unwrap();
        let ctx = ConfigContext::with_defaults();
        let before = ctx.clone();
        let _ = TemplateResolver::new().resolve(&template, &ctx).unwrap();
        assert_eq!(ctx, before);
    }

    proptest! {
        #[test]
        fn resolution_is_deterministic(
            app in "[a-z][a-z0-9-]{0,20}",
            version in 0i64..10_000,
            hosts in proptest::collection::vec("[a-z0-9.]{1,12}", 0..5),
        ) {
            let template = Template::parse(
                "deploy {{app_name}} v{{version}} on {{hosts}} ({{app_name}})",
            ).unwrap();
            let mut ctx = ConfigContext::new();
            ctx.set(Field::AppName, app.clone());
            ctx.set(Field::Version, version);
            ctx.set(Field::Hosts, hosts.clone());

            let resolver = TemplateResolver::new();
            let first = resolver.resolve(&template, &ctx).unwrap();
            let second = resolver.resolve(&template, &ctx).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(
                first,
                format!("deploy {app} v{version} on {} ({app})", hosts.join(","))
            );
        }
    }
}
