//! `{{name}}` / `{{name:default}}` substitution.
//!
//! Every placeholder is resolved once against the same context. Substituted
//! text is never scanned again, so a value that itself looks like a
//! placeholder is emitted verbatim.

use crate::models::Context;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{([^:}]+)(?::([^}]*))?\}\}").expect("placeholder pattern is valid")
    })
}

pub fn resolve<'a>(template: &'a str, context: &Context) -> Cow<'a, str> {
    placeholder_pattern().replace_all(template, |caps: &Captures| {
        let name = &caps[1];
        match context.get(name) {
            Some(value) => value.render(),
            None => caps
                .get(2)
                .map(|default| default.as_str().to_string())
                .unwrap_or_default(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ContextValue;
    use serde_json::json;

    #[test]
    fn text_without_placeholders_is_returned_unchanged() {
        let ctx = Context::empty().with("x", "v");
        for template in ["", "plain", "{single}", "{{}}", "{{ unterminated", "a}}b"] {
            assert_eq!(resolve(template, &ctx), template);
            assert!(matches!(resolve(template, &ctx), Cow::Borrowed(_)));
        }
    }

    #[test]
    fn missing_variable_without_default_becomes_empty() {
        assert_eq!(resolve("{{x}}", &Context::empty()), "");
        assert_eq!(resolve("a{{x}}b", &Context::empty()), "ab");
    }

    #[test]
    fn missing_variable_uses_default() {
        assert_eq!(resolve("{{x:default}}", &Context::empty()), "default");
        assert_eq!(resolve("{{x:}}", &Context::empty()), "");
        assert_eq!(
            resolve("{{host:localhost}}:{{port:8080}}", &Context::empty()),
            "localhost:8080"
        );
    }

    #[test]
    fn bound_variable_wins_over_default() {
        let ctx = Context::empty().with("x", "v");
        assert_eq!(resolve("{{x}}", &ctx), "v");
        assert_eq!(resolve("{{x:other}}", &ctx), "v");
    }

    #[test]
    fn numbers_substitute_their_decimal_form() {
        let ctx = Context::empty().with("x", 42i64);
        assert_eq!(resolve("{{x}}", &ctx), "42");
    }

    #[test]
    fn structured_values_substitute_compact_json() {
        let ctx = Context::empty()
            .with("obj", ContextValue::Structured(json!({"a": 1})))
            .with("quoted", ContextValue::Structured(json!("plain")));
        assert_eq!(resolve(r#"{"data":{{obj}}}"#, &ctx), r#"{"data":{"a":1}}"#);
        assert_eq!(resolve("/users/{{quoted}}", &ctx), "/users/plain");
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let ctx = Context::empty().with("a", "{{b}}").with("b", "nope");
        assert_eq!(resolve("{{a}}", &ctx), "{{b}}");
    }

    #[test]
    fn every_occurrence_is_resolved() {
        let ctx = Context::empty().with("id", "7");
        assert_eq!(
            resolve("/items/{{id}}?again={{id}}&other={{missing:none}}", &ctx),
            "/items/7?again=7&other=none"
        );
    }
}
