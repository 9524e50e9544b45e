//! Bound repository
//!
//! Holds one resolved entry per contract method. A call packs its arguments
//! into a request context and dispatches through the method's plan.

use std::collections::HashMap;
use std::sync::Arc;

use super::descriptor::{ParamDescriptor, ParamKind};
use super::returns::MethodReturn;
use crate::core::{MapperError, ParamBag, Result, Value};
use crate::evaluator::RequestContext;
use crate::executor::{Dispatch, ExecutionPlan, SqlMapper, TypeShape};
use crate::statement::DataSourceChoice;

#[derive(Debug, Clone)]
pub(crate) enum BoundMethod {
    /// Returns the mapper without touching the database
    Accessor,
    Statement {
        plan: ExecutionPlan,
        params: Vec<ParamDescriptor>,
    },
}

#[derive(Debug)]
pub struct Repository {
    contract: String,
    mapper: Arc<SqlMapper>,
    methods: HashMap<String, BoundMethod>,
}

impl Repository {
    pub(crate) fn new(contract: String, mapper: Arc<SqlMapper>, methods: HashMap<String, BoundMethod>) -> Self {
        Self { contract, mapper, methods }
    }

    #[must_use]
    pub fn contract(&self) -> &str {
        &self.contract
    }

    #[must_use]
    pub const fn mapper(&self) -> &Arc<SqlMapper> {
        &self.mapper
    }

    /// Resolved plan of a statement-backed method
    #[must_use]
    pub fn plan(&self, method: &str) -> Option<&ExecutionPlan> {
        match self.methods.get(method)? {
            BoundMethod::Statement { plan, .. } => Some(plan),
            BoundMethod::Accessor => None,
        }
    }

    #[must_use]
    pub fn is_accessor(&self, method: &str) -> bool {
        matches!(self.methods.get(method), Some(BoundMethod::Accessor))
    }

    /// Sorted names of every bound method
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Invoke a synchronous method
    pub fn call<R: MethodReturn>(&self, method: &str, args: Vec<Value>) -> Result<R> {
        match self.bound::<R>(method, Dispatch::Sync)? {
            BoundMethod::Accessor => R::invoke(&self.mapper, Default::default(), &mut RequestContext::default()),
            BoundMethod::Statement { plan, params } => {
                let mut ctx = self.request(method, plan, params, args)?;
                R::invoke(&self.mapper, plan.behavior, &mut ctx)
            }
        }
    }

    /// Invoke an asynchronous method
    pub async fn call_async<R: MethodReturn>(&self, method: &str, args: Vec<Value>) -> Result<R> {
        match self.bound::<R>(method, Dispatch::Async)? {
            BoundMethod::Accessor => {
                R::invoke_async(&self.mapper, Default::default(), &mut RequestContext::default()).await
            }
            BoundMethod::Statement { plan, params } => {
                let mut ctx = self.request(method, plan, params, args)?;
                R::invoke_async(&self.mapper, plan.behavior, &mut ctx).await
            }
        }
    }

    /// Invoke a synchronous method with a caller-built request
    ///
    /// The context is used as given; an unset statement, command type or
    /// data source is taken from the method's plan. Declared parameters are
    /// not consulted.
    pub fn call_context<R: MethodReturn>(&self, method: &str, ctx: RequestContext) -> Result<R> {
        match self.bound::<R>(method, Dispatch::Sync)? {
            BoundMethod::Accessor => R::invoke(&self.mapper, Default::default(), &mut RequestContext::default()),
            BoundMethod::Statement { plan, .. } => {
                let mut ctx = adopt(plan, ctx);
                R::invoke(&self.mapper, plan.behavior, &mut ctx)
            }
        }
    }

    /// Async twin of [`Repository::call_context`]
    pub async fn call_context_async<R: MethodReturn>(&self, method: &str, ctx: RequestContext) -> Result<R> {
        match self.bound::<R>(method, Dispatch::Async)? {
            BoundMethod::Accessor => {
                R::invoke_async(&self.mapper, Default::default(), &mut RequestContext::default()).await
            }
            BoundMethod::Statement { plan, .. } => {
                let mut ctx = adopt(plan, ctx);
                R::invoke_async(&self.mapper, plan.behavior, &mut ctx).await
            }
        }
    }

    fn label(&self, method: &str) -> String {
        format!("{}.{method}", self.contract)
    }

    fn bound<R: MethodReturn>(&self, method: &str, dispatch: Dispatch) -> Result<&BoundMethod> {
        let bound = self
            .methods
            .get(method)
            .ok_or_else(|| MapperError::MethodNotFound(self.label(method)))?;
        let (shape, declared) = match bound {
            BoundMethod::Accessor => (TypeShape::Accessor, dispatch),
            BoundMethod::Statement { plan, .. } => (plan.shape.clone(), plan.dispatch),
        };
        if declared != dispatch {
            return Err(MapperError::ShapeMismatch {
                statement: self.label(method),
                reason: format!("method is declared {declared:?} but was called {dispatch:?}"),
            });
        }
        if R::shape() != shape {
            return Err(MapperError::ShapeMismatch {
                statement: self.label(method),
                reason: format!("declared return {shape:?} but {:?} was requested", R::shape()),
            });
        }
        Ok(bound)
    }

    fn request(
        &self,
        method: &str,
        plan: &ExecutionPlan,
        params: &[ParamDescriptor],
        args: Vec<Value>,
    ) -> Result<RequestContext> {
        let mut ctx = match &plan.sql {
            Some(sql) => RequestContext::from_sql(sql.clone()),
            None => RequestContext::default(),
        };
        ctx.scope.clone_from(&plan.scope);
        ctx.sql_id.clone_from(&plan.id);
        ctx.command_type = Some(plan.command_type);
        ctx.source_choice = plan.source_choice;
        ctx.request = self.pack(method, params, args)?;
        Ok(ctx)
    }

    /// Build the parameter bag from positional arguments
    fn pack(&self, method: &str, params: &[ParamDescriptor], args: Vec<Value>) -> Result<ParamBag> {
        if args.len() != params.len() {
            return Err(MapperError::ShapeMismatch {
                statement: self.label(method),
                reason: format!("expected {} arguments, got {}", params.len(), args.len()),
            });
        }
        let ignore_case = self.mapper.options().ignore_parameter_case;

        if let [param] = params {
            if param.kind == ParamKind::Object {
                match args.first() {
                    Some(Value::Object(bag)) => return Ok(bag.clone().ignoring_case(ignore_case)),
                    Some(Value::Null) => return Ok(ParamBag::with_ignore_case(ignore_case)),
                    _ => {}
                }
            }
        }

        let mut bag = ParamBag::with_ignore_case(ignore_case);
        for (param, value) in params.iter().zip(args) {
            bag.insert(param.bag_name(), value);
        }
        Ok(bag)
    }
}

/// Fill what a caller-built context leaves unset from `plan`
fn adopt(plan: &ExecutionPlan, mut ctx: RequestContext) -> RequestContext {
    let targeted = ctx.real_sql.is_some() || !ctx.sql_id.is_empty();
    if !targeted {
        match &plan.sql {
            Some(sql) => ctx.real_sql = Some(sql.clone()),
            None => {
                ctx.scope.clone_from(&plan.scope);
                ctx.sql_id.clone_from(&plan.id);
            }
        }
    }
    if ctx.scope.is_empty() {
        ctx.scope.clone_from(&plan.scope);
    }
    if ctx.command_type.is_none() {
        ctx.command_type = Some(plan.command_type);
    }
    if ctx.source_choice == DataSourceChoice::Unknown {
        ctx.source_choice = plan.source_choice;
    }
    ctx
}
