//! Repository contract descriptors
//!
//! A contract is described as data: its name, an optional declared scope, the
//! contracts it extends and one descriptor per method. Return shapes are taken
//! from the Rust return type through [`MethodReturn`].

use super::returns::MethodReturn;
use crate::executor::{Dispatch, TypeShape};
use crate::statement::{CommandType, DataSourceChoice, ExecuteBehavior};

#[derive(Debug, Clone, Default)]
pub struct ContractDescriptor {
    pub name: String,
    /// Declared scope, overriding the one derived from the name
    pub scope: Option<String>,
    pub methods: Vec<MethodDescriptor>,
    pub extends: Vec<ContractDescriptor>,
}

impl ContractDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn extends(mut self, parent: Self) -> Self {
        self.extends.push(parent);
        self
    }

    /// Own methods plus inherited ones; a method redeclared here wins
    #[must_use]
    pub fn all_methods(&self) -> Vec<&MethodDescriptor> {
        let mut methods: Vec<&MethodDescriptor> = Vec::new();
        for parent in &self.extends {
            for method in parent.all_methods() {
                methods.retain(|m| m.name != method.name);
                methods.push(method);
            }
        }
        for method in &self.methods {
            methods.retain(|m| m.name != method.name);
            methods.push(method);
        }
        methods
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParamKind {
    /// Scalar argument, bound under its name
    #[default]
    Simple,
    /// Object argument; when it is the only one its fields form the bag
    Object,
    /// Open generic parameter
    Generic,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamDescriptor {
    pub name: String,
    /// Name used in the parameter bag instead of `name`
    pub alias: Option<String>,
    pub kind: ParamKind,
}

impl ParamDescriptor {
    #[must_use]
    pub fn bag_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// Per-method statement attributes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementOverride {
    pub scope: Option<String>,
    pub id: Option<String>,
    /// Literal SQL used instead of a catalog statement
    pub sql: Option<String>,
    pub execute: ExecuteBehavior,
    pub command_type: Option<CommandType>,
    pub source_choice: Option<DataSourceChoice>,
}

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<ParamDescriptor>,
    pub returns: TypeShape,
    pub dispatch: Dispatch,
    pub statement: StatementOverride,
}

impl MethodDescriptor {
    /// Synchronous method returning `R`
    pub fn new<R: MethodReturn>(name: impl Into<String>) -> Self {
        Self::with_shape(name, R::shape())
    }

    /// Method with an explicitly declared return shape
    pub fn with_shape(name: impl Into<String>, returns: TypeShape) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns,
            dispatch: Dispatch::Sync,
            statement: StatementOverride::default(),
        }
    }

    #[must_use]
    pub const fn asynchronous(mut self) -> Self {
        self.dispatch = Dispatch::Async;
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamDescriptor { name: name.into(), ..ParamDescriptor::default() });
        self
    }

    #[must_use]
    pub fn param_as(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.params.push(ParamDescriptor {
            name: name.into(),
            alias: Some(alias.into()),
            kind: ParamKind::Simple,
        });
        self
    }

    #[must_use]
    pub fn object_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamDescriptor {
            name: name.into(),
            alias: None,
            kind: ParamKind::Object,
        });
        self
    }

    #[must_use]
    pub fn generic_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamDescriptor {
            name: name.into(),
            alias: None,
            kind: ParamKind::Generic,
        });
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.statement.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.statement.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn sql(mut self, sql: impl Into<String>) -> Self {
        self.statement.sql = Some(sql.into());
        self
    }

    #[must_use]
    pub const fn execute(mut self, execute: ExecuteBehavior) -> Self {
        self.statement.execute = execute;
        self
    }

    #[must_use]
    pub const fn command_type(mut self, command_type: CommandType) -> Self {
        self.statement.command_type = Some(command_type);
        self
    }

    #[must_use]
    pub const fn source_choice(mut self, source_choice: DataSourceChoice) -> Self {
        self.statement.source_choice = Some(source_choice);
        self
    }
}
