use serde_json::{Number, Value};
use std::collections::BTreeMap;

/// A variable visible to template substitution.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Text(String),
    Number(Number),
    Structured(Value),
}

impl ContextValue {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            Value::Number(number) => Self::Number(number),
            other => Self::Structured(other),
        }
    }

    /// Text substituted for a placeholder bound to this value.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
            Self::Structured(value) => render_structured(value),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Number(number) => Value::Number(number.clone()),
            Self::Structured(value) => value.clone(),
        }
    }
}

impl From<&str> for ContextValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for ContextValue {
    fn from(number: i64) -> Self {
        Self::Number(number.into())
    }
}

/// Compact JSON for `value`, except that a lone string literal loses its
/// surrounding quotes.
pub fn render_structured(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Immutable set of variables handed from one step to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    values: BTreeMap<String, ContextValue>,
}

impl Context {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&ContextValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a copy with `name` bound to `value`.
    pub fn with(&self, name: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        let mut values = self.values.clone();
        values.insert(name.into(), value.into());
        Self { values }
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, ContextValue)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, ContextValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lone_string_literal_is_unquoted() {
        assert_eq!(render_structured(&json!("abc")), "abc");
        assert_eq!(render_structured(&json!("with \"quotes\"")), "with \"quotes\"");
    }

    #[test]
    fn other_structures_render_as_compact_json() {
        assert_eq!(render_structured(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
        assert_eq!(render_structured(&json!(["x"])), r#"["x"]"#);
        assert_eq!(render_structured(&json!(true)), "true");
        assert_eq!(render_structured(&Value::Null), "null");
    }

    #[test]
    fn numbers_render_in_decimal() {
        assert_eq!(ContextValue::from(42i64).render(), "42");
        assert_eq!(ContextValue::from_json(json!(1.5)).render(), "1.5");
    }

    #[test]
    fn from_json_picks_the_narrowest_kind() {
        assert_eq!(ContextValue::from_json(json!("t")), ContextValue::Text("t".into()));
        assert!(matches!(ContextValue::from_json(json!(7)), ContextValue::Number(_)));
        assert!(matches!(
            ContextValue::from_json(json!({"k": 1})),
            ContextValue::Structured(_)
        ));
    }

    #[test]
    fn with_leaves_the_original_untouched() {
        let base = Context::empty().with("a", "1");
        let extended = base.with("b", "2");
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
        assert_eq!(extended.to_json(), json!({"a": "1", "b": "2"}));
    }
}
