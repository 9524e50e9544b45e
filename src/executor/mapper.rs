//! SqlMapper facade
//!
//! Owns the process-scoped state (catalog, executor, handler registry, mapper
//! cache, options) and exposes one typed operation per execution behavior.
//! Every operation prepares the request context first: statement lookup,
//! dynamic SQL evaluation and parameter binding.

use std::mem;
use std::sync::Arc;

use super::command::CommandExecutor;
use crate::core::{MapperError, MapperOptions, Result, Value};
use crate::evaluator::{RequestContext, TagEvaluator};
use crate::mapping::{
    assemble, DataSet, DataTable, Entity, FromValue, MapperCache, MultipleResult, RowSource, TypeHandlerRegistry,
};
use crate::statement::StatementCatalog;

pub struct SqlMapper {
    catalog: Arc<dyn StatementCatalog>,
    executor: Arc<dyn CommandExecutor>,
    handlers: Arc<TypeHandlerRegistry>,
    cache: MapperCache,
    options: MapperOptions,
}

impl SqlMapper {
    pub fn new(catalog: Arc<dyn StatementCatalog>, executor: Arc<dyn CommandExecutor>) -> Self {
        let handlers = Arc::new(TypeHandlerRegistry::new());
        Self {
            catalog,
            executor,
            cache: MapperCache::new(Arc::clone(&handlers)),
            handlers,
            options: MapperOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: MapperOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the handler registry; drops every compiled mapper
    #[must_use]
    pub fn with_handlers(mut self, handlers: TypeHandlerRegistry) -> Self {
        self.handlers = Arc::new(handlers);
        self.cache = MapperCache::new(Arc::clone(&self.handlers));
        self
    }

    #[must_use]
    pub const fn options(&self) -> &MapperOptions {
        &self.options
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn StatementCatalog {
        self.catalog.as_ref()
    }

    #[must_use]
    pub const fn cache(&self) -> &MapperCache {
        &self.cache
    }

    #[must_use]
    pub fn handlers(&self) -> &TypeHandlerRegistry {
        &self.handlers
    }

    /// Resolve the statement and render SQL plus parameters into `ctx`
    pub fn prepare(&self, ctx: &mut RequestContext) -> Result<()> {
        if self.options.ignore_parameter_case && !ctx.request.ignore_case() {
            ctx.request = mem::take(&mut ctx.request).ignoring_case(true);
        }

        let evaluator = TagEvaluator::new(self.catalog.as_ref(), &self.options, &self.handlers);
        match ctx.real_sql.clone() {
            Some(sql) => evaluator.bind_sql(&sql, ctx),
            None => {
                let statement = self.catalog.get(&ctx.scope, &ctx.sql_id)?;
                ctx.attach_statement(Arc::clone(&statement));
                evaluator.evaluate(&statement, ctx)
            }
        }
    }

    /// Drop compiled mappers of one statement, e.g. after reloading it
    pub fn invalidate_statement(&self, statement_key: &str) {
        self.cache.invalidate_statement(statement_key);
    }

    fn reader(&self, ctx: &mut RequestContext) -> Result<Box<dyn RowSource>> {
        self.prepare(ctx)?;
        self.executor.execute_reader(ctx).map_err(MapperError::execution)
    }

    async fn reader_async(&self, ctx: &mut RequestContext) -> Result<Box<dyn RowSource>> {
        self.prepare(ctx)?;
        self.executor
            .execute_reader_async(ctx)
            .await
            .map_err(MapperError::execution)
    }

    /// Affected row count
    pub fn execute(&self, ctx: &mut RequestContext) -> Result<i64> {
        self.prepare(ctx)?;
        self.executor.execute(ctx).map_err(MapperError::execution)
    }

    pub fn execute_scalar<T: FromValue>(&self, ctx: &mut RequestContext) -> Result<T> {
        self.prepare(ctx)?;
        let value = self.executor.execute_scalar(ctx).map_err(MapperError::execution)?;
        scalar(ctx, value)
    }

    pub fn query<T: Entity>(&self, ctx: &mut RequestContext) -> Result<Vec<T>> {
        let mut reader = self.reader(ctx)?;
        self.cache.read_many(reader.as_mut(), ctx, 0)
    }

    pub fn query_single<T: Entity>(&self, ctx: &mut RequestContext) -> Result<Option<T>> {
        let mut reader = self.reader(ctx)?;
        self.cache.read_single(reader.as_mut(), ctx, 0)
    }

    /// First result set, unmapped
    pub fn get_table(&self, ctx: &mut RequestContext) -> Result<DataTable> {
        let mut reader = self.reader(ctx)?;
        DataTable::load(reader.as_mut())
    }

    pub fn get_dataset(&self, ctx: &mut RequestContext) -> Result<DataSet> {
        let mut reader = self.reader(ctx)?;
        DataSet::load(reader.as_mut())
    }

    /// One tuple element per result set, in order
    pub fn fill_multiple<R: MultipleResult>(&self, ctx: &mut RequestContext) -> Result<R> {
        let mut reader = self.reader(ctx)?;
        R::read(&self.cache, reader.as_mut(), ctx)
    }

    /// Root entity with the sub-collections named by the multiple-result map
    pub fn get_nested<T: Entity>(&self, ctx: &mut RequestContext) -> Result<Option<T>> {
        let mut reader = self.reader(ctx)?;
        let dataset = DataSet::load(reader.as_mut())?;
        assemble(&self.cache, ctx, dataset)
    }

    pub async fn execute_async(&self, ctx: &mut RequestContext) -> Result<i64> {
        self.prepare(ctx)?;
        self.executor.execute_async(ctx).await.map_err(MapperError::execution)
    }

    pub async fn execute_scalar_async<T: FromValue>(&self, ctx: &mut RequestContext) -> Result<T> {
        self.prepare(ctx)?;
        let value = self
            .executor
            .execute_scalar_async(ctx)
            .await
            .map_err(MapperError::execution)?;
        scalar(ctx, value)
    }

    pub async fn query_async<T: Entity>(&self, ctx: &mut RequestContext) -> Result<Vec<T>> {
        let mut reader = self.reader_async(ctx).await?;
        self.cache.read_many_async(reader.as_mut(), ctx, 0).await
    }

    pub async fn query_single_async<T: Entity>(&self, ctx: &mut RequestContext) -> Result<Option<T>> {
        let mut reader = self.reader_async(ctx).await?;
        self.cache.read_single_async(reader.as_mut(), ctx, 0).await
    }

    pub async fn get_table_async(&self, ctx: &mut RequestContext) -> Result<DataTable> {
        let mut reader = self.reader_async(ctx).await?;
        DataTable::load_async(reader.as_mut()).await
    }

    pub async fn get_dataset_async(&self, ctx: &mut RequestContext) -> Result<DataSet> {
        let mut reader = self.reader_async(ctx).await?;
        DataSet::load_async(reader.as_mut()).await
    }

    pub async fn fill_multiple_async<R: MultipleResult>(&self, ctx: &mut RequestContext) -> Result<R> {
        let mut reader = self.reader_async(ctx).await?;
        R::read_async(&self.cache, reader.as_mut(), ctx).await
    }

    pub async fn get_nested_async<T: Entity>(&self, ctx: &mut RequestContext) -> Result<Option<T>> {
        let mut reader = self.reader_async(ctx).await?;
        let dataset = DataSet::load_async(reader.as_mut()).await?;
        assemble(&self.cache, ctx, dataset)
    }
}

impl std::fmt::Debug for SqlMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlMapper")
            .field("cache", &self.cache)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn scalar<T: FromValue>(ctx: &RequestContext, value: Value) -> Result<T> {
    T::from_value(value).map_err(|found| MapperError::Conversion {
        target: ctx.statement_key(),
        expected: T::KIND.to_string(),
        found: found.to_string(),
    })
}
