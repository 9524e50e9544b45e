//! Nested graphs from multi-result commands
//!
//! The first result set yields the root entity; every later set is handed to
//! `Entity::fill_nested` under the property its multiple-result slot names.

use super::cache::MapperCache;
use super::entity::Entity;
use super::row_source::{DataSet, MemoryRowSource};
use crate::core::Result;
use crate::evaluator::RequestContext;

/// Rows of one nested result set, mapped on demand
pub struct NestedRows<'a> {
    cache: &'a MapperCache,
    ctx: &'a mut RequestContext,
    source: MemoryRowSource,
    index: usize,
}

impl NestedRows<'_> {
    /// Position of this set in the command's output
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    pub fn many<T: Entity>(&mut self) -> Result<Vec<T>> {
        self.cache.read_many(&mut self.source, self.ctx, self.index)
    }

    pub fn single<T: Entity>(&mut self) -> Result<Option<T>> {
        self.cache.read_single(&mut self.source, self.ctx, self.index)
    }
}

/// Member type that can receive a nested result set
pub trait NestedField: Sized {
    fn read(rows: &mut NestedRows<'_>) -> Result<Self>;
}

impl<T: Entity> NestedField for Vec<T> {
    fn read(rows: &mut NestedRows<'_>) -> Result<Self> {
        rows.many()
    }
}

impl<T: Entity> NestedField for Option<T> {
    fn read(rows: &mut NestedRows<'_>) -> Result<Self> {
        rows.single()
    }
}

/// Build the root of a graph from a buffered data set
pub fn assemble<T: Entity>(
    cache: &MapperCache,
    ctx: &mut RequestContext,
    dataset: DataSet,
) -> Result<Option<T>> {
    let slots = ctx
        .statement()
        .and_then(|statement| statement.multiple_result_map.clone());
    let mut tables = dataset.tables.into_iter();

    let mut root_source = MemoryRowSource::from_table(tables.next().unwrap_or_default());
    let Some(mut root) = cache.read_single::<T>(&mut root_source, ctx, 0)? else {
        return Ok(None);
    };

    for (offset, table) in tables.enumerate() {
        let index = offset + 1;
        let Some(property) = slots
            .as_ref()
            .and_then(|map| map.slot(index))
            .and_then(|slot| slot.property.clone())
        else {
            continue;
        };
        let mut rows = NestedRows {
            cache,
            ctx: &mut *ctx,
            source: MemoryRowSource::from_table(table),
            index,
        };
        root.fill_nested(&property, &mut rows)?;
    }
    Ok(Some(root))
}
