use serde::Deserialize;
use std::sync::Arc;

use crate::core::ValueKind;

/// Column → member binding
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Property {
    /// Member name on the target type
    pub name: String,
    pub column: String,
    /// Named type handler overriding the registry default
    #[serde(default)]
    pub handler: Option<String>,
}

/// Non-default constructor argument, read from a named column
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Arg {
    pub column: String,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ConstructorMap {
    pub args: Vec<Arg>,
}

impl ConstructorMap {
    #[must_use]
    pub fn signature(&self) -> Vec<ValueKind> {
        self.args.iter().map(|a| a.kind).collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ResultMap {
    pub id: String,
    #[serde(default)]
    pub constructor: Option<ConstructorMap>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ResultMap {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: &str, column: &str, handler: Option<&str>) -> Self {
        self.properties.push(Property {
            name: name.to_string(),
            column: column.to_string(),
            handler: handler.map(str::to_string),
        });
        self
    }

    #[must_use]
    pub fn with_constructor(mut self, args: Vec<(&str, ValueKind)>) -> Self {
        self.constructor = Some(ConstructorMap {
            args: args
                .into_iter()
                .map(|(column, kind)| Arg { column: column.to_string(), kind })
                .collect(),
        });
        self
    }

    /// Property bound to `column`: exact match first, then case-insensitive
    #[must_use]
    pub fn property_for_column(&self, column: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.column == column)
            .or_else(|| self.properties.iter().find(|p| p.column.eq_ignore_ascii_case(column)))
    }
}

/// One result set of a multi-result statement
#[derive(Debug, Clone, Default)]
pub struct ResultSlot {
    /// Member of the root entity receiving this set; the root slot has none
    pub property: Option<String>,
    pub result_map: Option<Arc<ResultMap>>,
}

#[derive(Debug, Clone, Default)]
pub struct MultipleResultMap {
    pub id: String,
    pub results: Vec<ResultSlot>,
}

impl MultipleResultMap {
    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&ResultSlot> {
        self.results.get(index)
    }

    /// Index of the result set bound to `property`
    #[must_use]
    pub fn position(&self, property: &str) -> Option<usize> {
        self.results
            .iter()
            .position(|slot| slot.property.as_deref() == Some(property))
    }
}

/// Placeholder → request property / handler binding
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ParameterDef {
    pub name: String,
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub handler: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ParameterMap {
    pub id: String,
    pub parameters: Vec<ParameterDef>,
}

impl ParameterMap {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_for_column() {
        let map = ResultMap::new("User")
            .with_property("user_name", "UserName", None)
            .with_property("status", "Status", Some("Json"));
        assert_eq!(map.property_for_column("UserName").unwrap().name, "user_name");
        assert_eq!(map.property_for_column("username").unwrap().name, "user_name");
        assert_eq!(map.property_for_column("status").unwrap().handler.as_deref(), Some("Json"));
        assert!(map.property_for_column("missing").is_none());
    }

    #[test]
    fn test_multiple_result_positions() {
        let map = MultipleResultMap {
            id: "OrderGraph".to_string(),
            results: vec![
                ResultSlot::default(),
                ResultSlot { property: Some("items".to_string()), result_map: None },
            ],
        };
        assert_eq!(map.position("items"), Some(1));
        assert_eq!(map.position("root"), None);
    }
}
