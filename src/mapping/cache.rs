//! Compiled mapper cache
//!
//! One mapper per (statement, result set, target type). Hits are plain
//! `DashMap` reads; a miss goes through a per-key `OnceCell`, so concurrent
//! first calls compile exactly once and all receive the same mapper.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::compiler::{MapperCompiler, RowMapper};
use super::entity::Entity;
use super::handlers::TypeHandlerRegistry;
use super::row_source::RowSource;
use crate::core::{MapperError, Result};
use crate::evaluator::RequestContext;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapperKey {
    /// Statement full id, or the fingerprint of literal SQL
    pub statement: String,
    pub result_index: usize,
    pub target: TypeId,
}

type Slot = Arc<OnceCell<Arc<dyn Any + Send + Sync>>>;

pub struct MapperCache {
    compiler: MapperCompiler,
    entries: DashMap<MapperKey, Slot>,
    compilations: AtomicUsize,
}

impl MapperCache {
    #[must_use]
    pub fn new(handlers: Arc<TypeHandlerRegistry>) -> Self {
        Self {
            compiler: MapperCompiler::new(handlers),
            entries: DashMap::new(),
            compilations: AtomicUsize::new(0),
        }
    }

    /// Mapper for `T` over the current result set of `source`
    pub fn get_or_compile<T: Entity>(
        &self,
        ctx: &RequestContext,
        result_index: usize,
        source: &dyn RowSource,
    ) -> Result<RowMapper<T>> {
        let key = MapperKey {
            statement: ctx.statement_key(),
            result_index,
            target: TypeId::of::<T>(),
        };

        // Fast path; the shard guard is released before any compilation
        let slot = match self.entries.get(&key) {
            Some(slot) => Arc::clone(slot.value()),
            None => Arc::clone(self.entries.entry(key.clone()).or_default().value()),
        };

        let erased = slot.get_or_try_init(|| {
            let mapper = self.compiler.compile::<T>(source, ctx.result_map().map(Arc::as_ref))?;
            self.compilations.fetch_add(1, Ordering::Relaxed);
            debug!(
                statement = %key.statement,
                result_index,
                type_name = T::TYPE_NAME,
                "Compiled row mapper"
            );
            Ok::<_, MapperError>(Arc::new(mapper) as Arc<dyn Any + Send + Sync>)
        })?;

        erased
            .downcast_ref::<RowMapper<T>>()
            .cloned()
            .ok_or_else(|| MapperError::ShapeMismatch {
                statement: key.statement.clone(),
                reason: format!("cached mapper is not for {}", T::TYPE_NAME),
            })
    }

    /// Number of mappers compiled so far
    #[must_use]
    pub fn compilations(&self) -> usize {
        self.compilations.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every mapper built for `statement_key`
    pub fn invalidate_statement(&self, statement_key: &str) {
        self.entries.retain(|key, _| key.statement != statement_key);
        debug!(statement = statement_key, "Invalidated row mappers");
    }

    fn select_result_map(ctx: &mut RequestContext, index: usize) {
        if let Some(statement) = ctx.statement().cloned() {
            ctx.set_result_map(statement.result_map_at(index));
        }
    }

    /// Map every remaining row of the current result set
    pub fn read_many<T: Entity>(
        &self,
        source: &mut dyn RowSource,
        ctx: &mut RequestContext,
        index: usize,
    ) -> Result<Vec<T>> {
        Self::select_result_map(ctx, index);
        let mut items = Vec::new();
        if !source.read()? {
            return Ok(items);
        }
        let mapper = self.get_or_compile::<T>(ctx, index, &*source)?;
        loop {
            items.push(mapper(&*source, ctx)?);
            if !source.read()? {
                break;
            }
        }
        Ok(items)
    }

    /// Map the first row of the current result set
    pub fn read_single<T: Entity>(
        &self,
        source: &mut dyn RowSource,
        ctx: &mut RequestContext,
        index: usize,
    ) -> Result<Option<T>> {
        Self::select_result_map(ctx, index);
        if !source.read()? {
            return Ok(None);
        }
        let mapper = self.get_or_compile::<T>(ctx, index, &*source)?;
        mapper(&*source, ctx).map(Some)
    }

    pub async fn read_many_async<T: Entity>(
        &self,
        source: &mut dyn RowSource,
        ctx: &mut RequestContext,
        index: usize,
    ) -> Result<Vec<T>> {
        Self::select_result_map(ctx, index);
        let mut items = Vec::new();
        if !source.read_async().await? {
            return Ok(items);
        }
        let mapper = self.get_or_compile::<T>(ctx, index, &*source)?;
        loop {
            items.push(mapper(&*source, ctx)?);
            if !source.read_async().await? {
                break;
            }
        }
        Ok(items)
    }

    pub async fn read_single_async<T: Entity>(
        &self,
        source: &mut dyn RowSource,
        ctx: &mut RequestContext,
        index: usize,
    ) -> Result<Option<T>> {
        Self::select_result_map(ctx, index);
        if !source.read_async().await? {
            return Ok(None);
        }
        let mapper = self.get_or_compile::<T>(ctx, index, &*source)?;
        mapper(&*source, ctx).map(Some)
    }
}

impl std::fmt::Debug for MapperCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapperCache")
            .field("entries", &self.entries.len())
            .field("compilations", &self.compilations())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::impl_entity;
    use crate::mapping::MemoryRowSource;

    #[derive(Debug, Default, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    impl_entity!(User { id: i64, name: String });

    fn users() -> MemoryRowSource {
        MemoryRowSource::new(
            &["id", "name"],
            vec![
                vec![Value::Integer(1), Value::Text("a".into())],
                vec![Value::Integer(2), Value::Text("b".into())],
            ],
        )
    }

    fn cache() -> MapperCache {
        MapperCache::new(Arc::new(TypeHandlerRegistry::new()))
    }

    #[test]
    fn test_compiles_once_per_key() {
        let cache = cache();
        let mut ctx = RequestContext::new("User", "GetList");
        let first: Vec<User> = cache.read_many(&mut users(), &mut ctx, 0).unwrap();
        let second: Vec<User> = cache.read_many(&mut users(), &mut ctx, 0).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_eq!(cache.compilations(), 1);

        // A different target type is a different key
        let ids: Vec<i64> = cache.read_many(&mut users(), &mut ctx, 0).unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(cache.compilations(), 2);

        let mut other = RequestContext::new("User", "GetOther");
        let _: Option<User> = cache.read_single(&mut users(), &mut other, 0).unwrap();
        assert_eq!(cache.compilations(), 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_same_mapper_instance() {
        let cache = cache();
        let ctx = RequestContext::new("User", "GetList");
        let mut source = users();
        source.read().unwrap();
        let a = cache.get_or_compile::<User>(&ctx, 0, &source).unwrap();
        let b = cache.get_or_compile::<User>(&ctx, 0, &source).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_empty_result_compiles_nothing() {
        let cache = cache();
        let mut ctx = RequestContext::new("User", "GetList");
        let mut empty = MemoryRowSource::new(&["id"], vec![]);
        let users: Vec<User> = cache.read_many(&mut empty, &mut ctx, 0).unwrap();
        assert!(users.is_empty());
        assert_eq!(cache.compilations(), 0);
    }

    #[test]
    fn test_failed_compilation_is_not_cached() {
        #[derive(Debug)]
        struct NoDefault {
            id: i64,
        }
        impl_entity!(NoDefault { id: i64 } constructors { (id: i64) => NoDefault { id } });

        let cache = cache();
        let mut ctx = RequestContext::new("User", "GetList");
        let err = cache.read_many::<NoDefault>(&mut users(), &mut ctx, 0).unwrap_err();
        assert!(matches!(err, MapperError::NoDefaultConstructor(_)));
        assert_eq!(cache.compilations(), 0);
        assert!(cache.read_many::<NoDefault>(&mut users(), &mut ctx, 0).is_err());
    }

    #[test]
    fn test_invalidate_statement() {
        let cache = cache();
        let mut ctx = RequestContext::new("User", "GetList");
        let _: Vec<User> = cache.read_many(&mut users(), &mut ctx, 0).unwrap();
        cache.invalidate_statement("User.GetList");
        assert!(cache.is_empty());
        let _: Vec<User> = cache.read_many(&mut users(), &mut ctx, 0).unwrap();
        assert_eq!(cache.compilations(), 2);
    }

    #[tokio::test]
    async fn test_async_reads() {
        let cache = cache();
        let mut ctx = RequestContext::new("User", "GetList");
        let all: Vec<User> = cache.read_many_async(&mut users(), &mut ctx, 0).await.unwrap();
        assert_eq!(all[1], User { id: 2, name: "b".into() });
        let first: Option<User> = cache.read_single_async(&mut users(), &mut ctx, 0).await.unwrap();
        assert_eq!(first.unwrap().id, 1);
    }
}
