//! Multi-result-set reads into tuples
//!
//! Element `i` of the tuple is filled from result set `i`: a `Vec<T>` takes
//! every row, an `Option<T>` the first one.

use async_trait::async_trait;
use tracing::debug;

use super::cache::MapperCache;
use super::entity::Entity;
use super::row_source::RowSource;
use crate::core::Result;
use crate::evaluator::RequestContext;

/// Declared form of one tuple element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementShape {
    Many(&'static str),
    Single(&'static str),
}

#[async_trait]
pub trait ResultElement: Sized + Send {
    fn shape() -> ElementShape;

    /// Value for a position the reader has no result set for
    fn missing() -> Self;

    fn read(cache: &MapperCache, source: &mut dyn RowSource, ctx: &mut RequestContext, index: usize)
        -> Result<Self>;

    async fn read_async(
        cache: &MapperCache,
        source: &mut dyn RowSource,
        ctx: &mut RequestContext,
        index: usize,
    ) -> Result<Self>;
}

#[async_trait]
impl<T: Entity> ResultElement for Vec<T> {
    fn shape() -> ElementShape {
        ElementShape::Many(T::TYPE_NAME)
    }

    fn missing() -> Self {
        Self::new()
    }

    fn read(cache: &MapperCache, source: &mut dyn RowSource, ctx: &mut RequestContext, index: usize)
        -> Result<Self> {
        cache.read_many(source, ctx, index)
    }

    async fn read_async(
        cache: &MapperCache,
        source: &mut dyn RowSource,
        ctx: &mut RequestContext,
        index: usize,
    ) -> Result<Self> {
        cache.read_many_async(source, ctx, index).await
    }
}

#[async_trait]
impl<T: Entity> ResultElement for Option<T> {
    fn shape() -> ElementShape {
        ElementShape::Single(T::TYPE_NAME)
    }

    fn missing() -> Self {
        None
    }

    fn read(cache: &MapperCache, source: &mut dyn RowSource, ctx: &mut RequestContext, index: usize)
        -> Result<Self> {
        cache.read_single(source, ctx, index)
    }

    async fn read_async(
        cache: &MapperCache,
        source: &mut dyn RowSource,
        ctx: &mut RequestContext,
        index: usize,
    ) -> Result<Self> {
        cache.read_single_async(source, ctx, index).await
    }
}

fn shortfall(ctx: &RequestContext, index: usize, arity: usize) {
    debug!(
        statement = %ctx.full_sql_id(),
        position = index,
        arity,
        "Fewer result sets than tuple elements; remaining positions are empty"
    );
}

/// Tuple of result elements, one per result set
#[async_trait]
pub trait MultipleResult: Sized + Send {
    fn shapes() -> Vec<ElementShape>;

    fn read(cache: &MapperCache, source: &mut dyn RowSource, ctx: &mut RequestContext) -> Result<Self>;

    async fn read_async(
        cache: &MapperCache,
        source: &mut dyn RowSource,
        ctx: &mut RequestContext,
    ) -> Result<Self>;
}

macro_rules! tuple_result {
    ($($name:ident),+) => {
        #[async_trait]
        impl<$($name: ResultElement),+> MultipleResult for ($($name,)+) {
            fn shapes() -> Vec<ElementShape> {
                vec![$($name::shape()),+]
            }

            #[allow(unused_assignments)]
            fn read(cache: &MapperCache, source: &mut dyn RowSource, ctx: &mut RequestContext) -> Result<Self> {
                let mut index = 0;
                let mut exhausted = false;
                Ok(($({
                    if index > 0 && !exhausted && !source.next_result()? {
                        shortfall(ctx, index, Self::shapes().len());
                        exhausted = true;
                    }
                    let element = if exhausted { $name::missing() } else { $name::read(cache, source, ctx, index)? };
                    index += 1;
                    element
                },)+))
            }

            #[allow(unused_assignments)]
            async fn read_async(
                cache: &MapperCache,
                source: &mut dyn RowSource,
                ctx: &mut RequestContext,
            ) -> Result<Self> {
                let mut index = 0;
                let mut exhausted = false;
                Ok(($({
                    if index > 0 && !exhausted && !source.next_result_async().await? {
                        shortfall(ctx, index, Self::shapes().len());
                        exhausted = true;
                    }
                    let element = if exhausted {
                        $name::missing()
                    } else {
                        $name::read_async(cache, source, ctx, index).await?
                    };
                    index += 1;
                    element
                },)+))
            }
        }
    };
}

tuple_result!(A);
tuple_result!(A, B);
tuple_result!(A, B, C);
tuple_result!(A, B, C, D);
tuple_result!(A, B, C, D, E);
tuple_result!(A, B, C, D, E, F);
tuple_result!(A, B, C, D, E, F, G);
tuple_result!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Value;
    use crate::impl_entity;
    use crate::mapping::{MemoryRowSource, TypeHandlerRegistry};
    use std::sync::Arc;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: i64,
    }

    impl_entity!(Person { id: i64 });

    #[derive(Debug, Default, PartialEq)]
    struct Order {
        total: i64,
    }

    impl_entity!(Order { total: i64 });

    fn source() -> MemoryRowSource {
        MemoryRowSource::new(&["id"], vec![vec![Value::Integer(1)], vec![Value::Integer(2)]])
            .with_result(&["total"], vec![vec![Value::Integer(50)]])
    }

    #[test]
    fn test_tuple_shapes() {
        assert_eq!(
            <(Vec<Person>, Option<Order>)>::shapes(),
            vec![ElementShape::Many("Person"), ElementShape::Single("Order")]
        );
    }

    #[test]
    fn test_read_positionally() {
        let cache = MapperCache::new(Arc::new(TypeHandlerRegistry::new()));
        let mut ctx = RequestContext::new("Shop", "Overview");
        let (people, order): (Vec<Person>, Option<Order>) =
            MultipleResult::read(&cache, &mut source(), &mut ctx).unwrap();
        assert_eq!(people, vec![Person { id: 1 }, Person { id: 2 }]);
        assert_eq!(order, Some(Order { total: 50 }));
    }

    #[test]
    fn test_missing_sets_are_empty() {
        let cache = MapperCache::new(Arc::new(TypeHandlerRegistry::new()));
        let mut ctx = RequestContext::new("Shop", "Overview");
        let (_, order, more): (Vec<Person>, Option<Order>, Vec<Order>) =
            MultipleResult::read(&cache, &mut source(), &mut ctx).unwrap();
        assert!(order.is_some());
        assert!(more.is_empty());
    }

    #[test]
    fn test_short_source_leaves_later_positions_empty() {
        let cache = MapperCache::new(Arc::new(TypeHandlerRegistry::new()));
        let mut ctx = RequestContext::new("Shop", "Overview");
        let mut single = MemoryRowSource::new(&["id"], vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
        let (first, rest, last): (Option<Person>, Vec<Person>, Option<Order>) =
            MultipleResult::read(&cache, &mut single, &mut ctx).unwrap();
        assert_eq!(first, Some(Person { id: 1 }));
        assert!(rest.is_empty());
        assert_eq!(last, None);
    }

    #[tokio::test]
    async fn test_short_source_async() {
        let cache = MapperCache::new(Arc::new(TypeHandlerRegistry::new()));
        let mut ctx = RequestContext::new("Shop", "Overview");
        let mut single = MemoryRowSource::new(&["id"], vec![vec![Value::Integer(1)], vec![Value::Integer(2)]]);
        let (first, rest): (Option<Person>, Vec<Person>) =
            MultipleResult::read_async(&cache, &mut single, &mut ctx).await.unwrap();
        assert_eq!(first, Some(Person { id: 1 }));
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_read_async() {
        let cache = MapperCache::new(Arc::new(TypeHandlerRegistry::new()));
        let mut ctx = RequestContext::new("Shop", "Overview");
        let (people, order): (Vec<Person>, Option<Order>) =
            MultipleResult::read_async(&cache, &mut source(), &mut ctx).await.unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(order.unwrap().total, 50);
    }
}
