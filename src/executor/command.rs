//! Database command seam
//!
//! The engine never talks to a driver directly. A `CommandExecutor` receives a
//! prepared `RequestContext` (SQL text, bound parameters, command type and
//! data-source choice) and returns an affected count, a scalar, or a cursor.

use async_trait::async_trait;

use crate::core::{ExecutionSource, Value};
use crate::evaluator::RequestContext;
use crate::mapping::RowSource;

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a non-query command and return the affected row count
    fn execute(&self, ctx: &RequestContext) -> Result<i64, ExecutionSource>;

    /// First column of the first row, NULL when there is none
    fn execute_scalar(&self, ctx: &RequestContext) -> Result<Value, ExecutionSource>;

    fn execute_reader(&self, ctx: &RequestContext) -> Result<Box<dyn RowSource>, ExecutionSource>;

    async fn execute_async(&self, ctx: &RequestContext) -> Result<i64, ExecutionSource> {
        self.execute(ctx)
    }

    async fn execute_scalar_async(&self, ctx: &RequestContext) -> Result<Value, ExecutionSource> {
        self.execute_scalar(ctx)
    }

    async fn execute_reader_async(
        &self,
        ctx: &RequestContext,
    ) -> Result<Box<dyn RowSource>, ExecutionSource> {
        self.execute_reader(ctx)
    }
}
