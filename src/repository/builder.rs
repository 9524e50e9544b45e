//! Repository binding
//!
//! Turns a contract descriptor into a `Repository` once, resolving every
//! method's scope, statement id and execution plan up front. Bound
//! repositories are cached per (contract, default scope, mapper) for the
//! builder's lifetime.

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error};

use super::descriptor::{ContractDescriptor, MethodDescriptor, ParamKind};
use super::invoke::{BoundMethod, Repository};
use crate::core::{MapperError, MapperOptions, Result};
use crate::executor::{Dispatch, PlanResolver, SqlMapper, StatementTarget, TypeShape};

/// Derives a statement id from (contract name, method)
pub type NamingFn = Arc<dyn Fn(&str, &MethodDescriptor) -> String + Send + Sync>;

/// Cache key of a bound repository
///
/// The cached repository holds its mapper, so the address stays unique while
/// the entry lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BindingKey {
    contract: String,
    default_scope: Option<String>,
    mapper: usize,
}

impl BindingKey {
    fn new(contract: &ContractDescriptor, mapper: &Arc<SqlMapper>, default_scope: Option<&str>) -> Self {
        Self {
            contract: contract.name.clone(),
            default_scope: default_scope.filter(|s| !s.is_empty()).map(str::to_string),
            mapper: Arc::as_ptr(mapper) as usize,
        }
    }
}

#[derive(Default)]
pub struct RepositoryBuilder {
    naming: Option<NamingFn>,
    repositories: DashMap<BindingKey, Arc<OnceCell<Arc<Repository>>>>,
}

impl RepositoryBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `naming` instead of the method name to derive statement ids
    #[must_use]
    pub fn with_naming<F>(mut self, naming: F) -> Self
    where
        F: Fn(&str, &MethodDescriptor) -> String + Send + Sync + 'static,
    {
        self.naming = Some(Arc::new(naming));
        self
    }

    /// Number of repositories bound so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.repositories.iter().filter(|entry| entry.value().get().is_some()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bind `contract` to `mapper`, or return the repository bound for the
    /// same contract, mapper and default scope earlier
    pub fn bind(
        &self,
        contract: &ContractDescriptor,
        mapper: Arc<SqlMapper>,
        default_scope: Option<&str>,
    ) -> Result<Arc<Repository>> {
        let key = BindingKey::new(contract, &mapper, default_scope);
        let slot = match self.repositories.get(&key) {
            Some(slot) => Arc::clone(slot.value()),
            None => Arc::clone(self.repositories.entry(key).or_default().value()),
        };
        slot.get_or_try_init(|| {
            self.build(contract, mapper, default_scope)
                .map(Arc::new)
                .inspect_err(|e| error!(contract = %contract.name, error = %e, "Failed to bind repository"))
        })
        .cloned()
    }

    fn build(
        &self,
        contract: &ContractDescriptor,
        mapper: Arc<SqlMapper>,
        default_scope: Option<&str>,
    ) -> Result<Repository> {
        let options = mapper.options();
        let contract_scope = contract
            .scope
            .clone()
            .or_else(|| default_scope.filter(|s| !s.is_empty()).map(str::to_string))
            .unwrap_or_else(|| scope_from_template(&options.scope_template, &contract.name));

        let mut methods = HashMap::new();
        for method in contract.all_methods() {
            let bound = if method.returns == TypeShape::Accessor {
                debug!(contract = %contract.name, method = %method.name, "Bound accessor");
                BoundMethod::Accessor
            } else {
                self.bind_method(contract, method, &contract_scope, &mapper, options)?
            };
            methods.insert(method.name.clone(), bound);
        }

        Ok(Repository::new(contract.name.clone(), Arc::clone(&mapper), methods))
    }

    fn bind_method(
        &self,
        contract: &ContractDescriptor,
        method: &MethodDescriptor,
        contract_scope: &str,
        mapper: &SqlMapper,
        options: &MapperOptions,
    ) -> Result<BoundMethod> {
        if let Some(param) = method.params.iter().find(|p| p.kind == ParamKind::Generic) {
            return Err(MapperError::UnsupportedGeneric {
                contract: contract.name.clone(),
                method: method.name.clone(),
                parameter: param.name.clone(),
            });
        }

        let overrides = &method.statement;
        let scope = overrides.scope.clone().unwrap_or_else(|| contract_scope.to_string());
        let id = match (&overrides.id, &self.naming) {
            (Some(id), _) => id.clone(),
            (None, Some(naming)) => naming(&contract.name, method),
            (None, None) => statement_id(method, &options.async_suffix),
        };

        let target = StatementTarget {
            contract: contract.name.clone(),
            method: method.name.clone(),
            scope,
            id,
            sql: overrides.sql.clone(),
            execute: overrides.execute,
            command_type: overrides.command_type,
            source_choice: overrides.source_choice,
        };
        let plan = PlanResolver::resolve(mapper.catalog(), &target, &method.returns, method.dispatch)?;

        debug!(
            contract = %contract.name,
            method = %method.name,
            statement = %plan.full_id(),
            behavior = ?plan.behavior,
            is_async = plan.dispatch == Dispatch::Async,
            "Bound repository method"
        );
        Ok(BoundMethod::Statement {
            plan,
            params: method.params.clone(),
        })
    }
}

impl std::fmt::Debug for RepositoryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryBuilder")
            .field("repositories", &self.repositories.len())
            .field("custom_naming", &self.naming.is_some())
            .finish()
    }
}

/// Scope encoded in a contract name, e.g. `IUserRepository` → `User`
///
/// Names that do not fit the template are used as they are.
#[must_use]
pub fn scope_from_template(template: &str, contract: &str) -> String {
    let Some((prefix, suffix)) = template.split_once("{Scope}") else {
        return contract.to_string();
    };
    contract
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_suffix(suffix))
        .filter(|scope| !scope.is_empty())
        .unwrap_or(contract)
        .to_string()
}

/// Method name, minus the async suffix for async methods
#[must_use]
pub fn statement_id(method: &MethodDescriptor, async_suffix: &str) -> String {
    let name = method.name.as_str();
    match method.dispatch {
        Dispatch::Async if !async_suffix.is_empty() => name
            .strip_suffix(async_suffix)
            .filter(|id| !id.is_empty())
            .unwrap_or(name)
            .to_string(),
        _ => name.to_string(),
    }
}
