//! Type handlers
//!
//! A handler converts a raw column value into the declared kind of a member,
//! and a request value into the value bound for a placeholder.

use std::collections::HashMap;
use std::sync::Arc;

use super::row_source::RowSource;
use crate::core::{MapperError, Result, Value, ValueKind};

pub trait TypeHandler: Send + Sync {
    fn get_value(&self, source: &dyn RowSource, column: usize, kind: ValueKind) -> Result<Value>;

    fn to_parameter(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }
}

/// Read a column and coerce it into `kind`
pub fn read_direct(source: &dyn RowSource, column: usize, kind: ValueKind) -> Result<Value> {
    let raw = source.value(column).cloned().unwrap_or(Value::Null);
    raw.coerce(kind).map_err(|found| MapperError::Conversion {
        target: source.column_name(column).to_string(),
        expected: kind.to_string(),
        found: found.to_string(),
    })
}

/// Column text holding a JSON document
pub struct JsonTypeHandler;

impl TypeHandler for JsonTypeHandler {
    fn get_value(&self, source: &dyn RowSource, column: usize, kind: ValueKind) -> Result<Value> {
        let value = match source.value(column) {
            Some(Value::Text(text)) => Value::from(serde_json::from_str::<serde_json::Value>(text)?),
            Some(other) => other.clone(),
            None => Value::Null,
        };
        value.coerce(kind).map_err(|found| MapperError::Conversion {
            target: source.column_name(column).to_string(),
            expected: kind.to_string(),
            found: found.to_string(),
        })
    }

    fn to_parameter(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Text(serde_json::to_string(&value.to_json())?))
    }
}

/// Handlers by member kind plus named handlers for per-property overrides
#[derive(Clone)]
pub struct TypeHandlerRegistry {
    by_kind: HashMap<ValueKind, Arc<dyn TypeHandler>>,
    named: HashMap<String, Arc<dyn TypeHandler>>,
}

impl Default for TypeHandlerRegistry {
    fn default() -> Self {
        let json: Arc<dyn TypeHandler> = Arc::new(JsonTypeHandler);
        let mut registry = Self {
            by_kind: HashMap::new(),
            named: HashMap::new(),
        };
        registry.by_kind.insert(ValueKind::List, Arc::clone(&json));
        registry.by_kind.insert(ValueKind::Object, Arc::clone(&json));
        registry.named.insert("Json".to_string(), json);
        registry
    }
}

impl TypeHandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ValueKind, handler: Arc<dyn TypeHandler>) {
        self.by_kind.insert(kind, handler);
    }

    pub fn register_named(&mut self, name: impl Into<String>, handler: Arc<dyn TypeHandler>) {
        self.named.insert(name.into(), handler);
    }

    #[must_use]
    pub fn get(&self, kind: ValueKind) -> Option<&Arc<dyn TypeHandler>> {
        self.by_kind.get(&kind)
    }

    pub fn named(&self, name: &str) -> Result<&Arc<dyn TypeHandler>> {
        self.named
            .get(name)
            .ok_or_else(|| MapperError::HandlerNotFound(name.to_string()))
    }
}

impl std::fmt::Debug for TypeHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut named: Vec<_> = self.named.keys().collect();
        named.sort();
        f.debug_struct("TypeHandlerRegistry")
            .field("kinds", &self.by_kind.len())
            .field("named", &named)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParamBag;
    use crate::mapping::MemoryRowSource;

    struct Upper;

    impl TypeHandler for Upper {
        fn get_value(&self, source: &dyn RowSource, column: usize, kind: ValueKind) -> Result<Value> {
            let value = read_direct(source, column, kind)?;
            Ok(value.as_text().map_or(value.clone(), |t| Value::Text(t.to_uppercase())))
        }
    }

    fn row() -> MemoryRowSource {
        let mut source = MemoryRowSource::new(
            &["tags", "age", "name"],
            vec![vec![
                Value::Text(r#"["a","b"]"#.into()),
                Value::Text("x".into()),
                Value::Text("bob".into()),
            ]],
        );
        source.read().unwrap();
        source
    }

    #[test]
    fn test_direct_read_conversion_error() {
        let source = row();
        let err = read_direct(&source, 1, ValueKind::Integer).unwrap_err();
        assert!(err.to_string().contains("'age'"));
        assert_eq!(read_direct(&source, 2, ValueKind::Text).unwrap(), Value::Text("bob".into()));
    }

    #[test]
    fn test_json_handler() {
        let source = row();
        let registry = TypeHandlerRegistry::new();
        let json = registry.named("Json").unwrap();
        let tags = json.get_value(&source, 0, ValueKind::List).unwrap();
        assert_eq!(tags, Value::List(vec![Value::Text("a".into()), Value::Text("b".into())]));

        let param = json
            .to_parameter(&Value::Object(ParamBag::new().with("k", 1_i64)))
            .unwrap();
        assert_eq!(param, Value::Text(r#"{"k":1}"#.into()));
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = TypeHandlerRegistry::new();
        assert!(registry.get(ValueKind::Text).is_none());
        assert!(registry.get(ValueKind::List).is_some());
        assert!(matches!(registry.named("Upper"), Err(MapperError::HandlerNotFound(_))));

        registry.register_named("Upper", Arc::new(Upper));
        let source = row();
        let value = registry.named("Upper").unwrap().get_value(&source, 2, ValueKind::Text).unwrap();
        assert_eq!(value, Value::Text("BOB".into()));
    }
}
