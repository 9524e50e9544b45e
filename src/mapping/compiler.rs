//! Row mapper compilation
//!
//! A compiled mapper is a closure that turns the current row of a row source
//! into a `T`. Column positions, member bindings and the constructor are all
//! resolved once, when the mapper is built.

use std::sync::Arc;

use super::entity::{no_constructor, Entity};
use super::handlers::{read_direct, TypeHandler, TypeHandlerRegistry};
use super::row_source::RowSource;
use crate::core::{MapperError, Result, Value, ValueKind};
use crate::evaluator::RequestContext;
use crate::statement::ResultMap;

pub type RowMapper<T> = Arc<dyn Fn(&dyn RowSource, &RequestContext) -> Result<T> + Send + Sync>;

/// One column read by a compiled mapper
#[derive(Clone)]
struct ColumnRead {
    index: usize,
    name: String,
    kind: ValueKind,
    handler: Option<Arc<dyn TypeHandler>>,
}

impl ColumnRead {
    fn read(
        &self,
        handlers: &TypeHandlerRegistry,
        source: &dyn RowSource,
        ctx: &RequestContext,
    ) -> Result<Value> {
        if let Some(name) = ctx.property_handler(&self.name) {
            return handlers.named(name)?.get_value(source, self.index, self.kind);
        }
        match &self.handler {
            Some(handler) => handler.get_value(source, self.index, self.kind),
            None => read_direct(source, self.index, self.kind),
        }
    }
}

pub struct MapperCompiler {
    handlers: Arc<TypeHandlerRegistry>,
}

impl MapperCompiler {
    #[must_use]
    pub const fn new(handlers: Arc<TypeHandlerRegistry>) -> Self {
        Self { handlers }
    }

    fn column(&self, index: usize, name: &str, kind: ValueKind) -> ColumnRead {
        ColumnRead {
            index,
            name: name.to_string(),
            kind,
            handler: self.handlers.get(kind).cloned(),
        }
    }

    /// Build a mapper for the columns `source` currently exposes
    pub fn compile<T: Entity>(
        &self,
        source: &dyn RowSource,
        result_map: Option<&ResultMap>,
    ) -> Result<RowMapper<T>> {
        let handlers = Arc::clone(&self.handlers);

        if let Some(kind) = T::SCALAR {
            if source.field_count() == 0 {
                return Err(MapperError::ColumnNotFound {
                    type_name: T::TYPE_NAME.to_string(),
                    column: "0".to_string(),
                });
            }
            let column = self.column(0, source.column_name(0), kind);
            return Ok(Arc::new(move |source: &dyn RowSource, ctx: &RequestContext| {
                T::from_scalar(column.read(&handlers, source, ctx)?)
            }));
        }

        if T::DYNAMIC {
            let columns: Vec<_> = (0..source.field_count())
                .map(|index| {
                    let column = source.column_name(index);
                    let name = result_map
                        .and_then(|map| map.property_for_column(column))
                        .map_or(column, |property| property.name.as_str())
                        .to_string();
                    (name, self.column(index, column, ValueKind::Any))
                })
                .collect();
            return Ok(Arc::new(move |source: &dyn RowSource, ctx: &RequestContext| {
                let mut row = T::new_default()
                    .ok_or_else(|| MapperError::NoDefaultConstructor(T::TYPE_NAME.to_string()))?;
                for (name, column) in &columns {
                    row.set_member(name, column.read(&handlers, source, ctx)?)?;
                }
                Ok(row)
            }));
        }

        // Constructor arguments come from named columns, in declared order
        let constructor = match result_map.and_then(|map| map.constructor.as_ref()) {
            Some(map) => {
                let signature = map.signature();
                if !T::constructors().iter().any(|c| *c == signature.as_slice()) {
                    return Err(no_constructor(T::TYPE_NAME, &signature));
                }
                let mut args = Vec::with_capacity(map.args.len());
                for arg in &map.args {
                    let index = source.ordinal(&arg.column).ok_or_else(|| MapperError::ColumnNotFound {
                        type_name: T::TYPE_NAME.to_string(),
                        column: arg.column.clone(),
                    })?;
                    args.push(self.column(index, source.column_name(index), arg.kind));
                }
                Some((signature, args))
            }
            None if T::HAS_DEFAULT => None,
            None => return Err(MapperError::NoDefaultConstructor(T::TYPE_NAME.to_string())),
        };

        let members = T::members();
        let mut bindings = Vec::new();
        for index in 0..source.field_count() {
            let column = source.column_name(index);
            let wanted = result_map
                .and_then(|map| map.property_for_column(column))
                .map_or(column, |property| property.name.as_str());
            let member = members
                .iter()
                .find(|m| m.name == wanted)
                .or_else(|| members.iter().find(|m| m.name.eq_ignore_ascii_case(wanted)));
            if let Some(member) = member {
                bindings.push((member.name, self.column(index, column, member.kind)));
            }
        }

        Ok(Arc::new(move |source: &dyn RowSource, ctx: &RequestContext| {
            let mut entity = match &constructor {
                Some((signature, args)) => {
                    let values = args
                        .iter()
                        .map(|arg| arg.read(&handlers, source, ctx))
                        .collect::<Result<Vec<_>>>()?;
                    T::construct(signature, values)?
                }
                None => T::new_default()
                    .ok_or_else(|| MapperError::NoDefaultConstructor(T::TYPE_NAME.to_string()))?,
            };
            for (member, column) in &bindings {
                entity.set_member(member, column.read(&handlers, source, ctx)?)?;
            }
            Ok(entity)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ParamBag;
    use crate::impl_entity;
    use crate::mapping::MemoryRowSource;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: i64,
        user_name: String,
        tags: Vec<Value>,
    }

    impl_entity!(Person { id: i64, user_name: String, tags: Vec<Value> });

    #[derive(Debug, PartialEq)]
    struct Account {
        id: i64,
        owner: String,
        note: Option<String>,
    }

    impl_entity!(Account { id: i64, owner: String, note: Option<String> }
        constructors { (id: i64, owner: String) => Account { id, owner, note: None } });

    fn compiler() -> MapperCompiler {
        MapperCompiler::new(Arc::new(TypeHandlerRegistry::new()))
    }

    fn first_row(mut source: MemoryRowSource) -> MemoryRowSource {
        source.read().unwrap();
        source
    }

    #[test]
    fn test_map_by_column_name() {
        let source = first_row(MemoryRowSource::new(
            &["ID", "user_name", "ignored"],
            vec![vec![Value::Integer(1), Value::Text("ann".into()), Value::Boolean(true)]],
        ));
        let mapper = compiler().compile::<Person>(&source, None).unwrap();
        let ctx = RequestContext::new("User", "Get");
        let person = mapper(&source, &ctx).unwrap();
        assert_eq!(person, Person { id: 1, user_name: "ann".into(), tags: vec![] });

        // Same routine, same row, same result
        assert_eq!(mapper(&source, &ctx).unwrap(), person);
    }

    #[test]
    fn test_result_map_and_named_handler() {
        let map = ResultMap::new("Person")
            .with_property("user_name", "UserName", None)
            .with_property("tags", "tags_json", Some("Json"));
        let source = first_row(MemoryRowSource::new(
            &["UserName", "tags_json"],
            vec![vec![Value::Text("bo".into()), Value::Text("[1]".into())]],
        ));
        let mapper = compiler().compile::<Person>(&source, Some(&map)).unwrap();
        let mut ctx = RequestContext::new("User", "Get");
        ctx.set_result_map(Some(Arc::new(map)));
        let person = mapper(&source, &ctx).unwrap();
        assert_eq!(person.user_name, "bo");
        assert_eq!(person.tags, vec![Value::Integer(1)]);
    }

    #[test]
    fn test_constructor_map() {
        let map = ResultMap::new("Account")
            .with_constructor(vec![("account_id", ValueKind::Integer), ("owner", ValueKind::Text)]);
        let source = first_row(MemoryRowSource::new(
            &["account_id", "owner", "note"],
            vec![vec![Value::Integer(9), Value::Text("zed".into()), Value::Text("vip".into())]],
        ));
        let mapper = compiler().compile::<Account>(&source, Some(&map)).unwrap();
        let account = mapper(&source, &RequestContext::default()).unwrap();
        assert_eq!(
            account,
            Account { id: 9, owner: "zed".into(), note: Some("vip".into()) }
        );
    }

    #[test]
    fn test_constructor_errors() {
        let source = MemoryRowSource::new(&["id"], vec![]);
        let err = compiler().compile::<Account>(&source, None).err().unwrap();
        assert_eq!(
            err.to_string(),
            "No parameterless constructor defined for the target type: [Account]"
        );

        let wrong = ResultMap::new("A").with_constructor(vec![("id", ValueKind::Text)]);
        let err = compiler().compile::<Account>(&source, Some(&wrong)).err().unwrap();
        assert!(matches!(err, MapperError::NoMatchingConstructor { .. }));

        let missing = ResultMap::new("A")
            .with_constructor(vec![("id", ValueKind::Integer), ("owner", ValueKind::Text)]);
        let err = compiler().compile::<Account>(&source, Some(&missing)).err().unwrap();
        assert!(matches!(err, MapperError::ColumnNotFound { ref column, .. } if column == "owner"));
    }

    #[test]
    fn test_dynamic_row_takes_every_column() {
        let map = ResultMap::new("Row").with_property("name", "user_name", None);
        let source = first_row(MemoryRowSource::new(
            &["id", "user_name", "score"],
            vec![vec![Value::Integer(3), Value::Text("cy".into()), Value::Null]],
        ));
        let mapper = compiler().compile::<ParamBag>(&source, Some(&map)).unwrap();
        let row = mapper(&source, &RequestContext::default()).unwrap();
        assert_eq!(row.len(), 3);
        assert_eq!(row.get("id"), Some(&Value::Integer(3)));
        assert_eq!(row.get("name"), Some(&Value::Text("cy".into())));
        assert_eq!(row.get("score"), Some(&Value::Null));
        assert_eq!(row.get("user_name"), None);
    }

    #[test]
    fn test_scalar_target() {
        let source = first_row(MemoryRowSource::new(&["count"], vec![vec![Value::Integer(42)]]));
        let mapper = compiler().compile::<i32>(&source, None).unwrap();
        assert_eq!(mapper(&source, &RequestContext::default()).unwrap(), 42);
    }
}
