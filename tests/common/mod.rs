// Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use mapsql::core::{ExecutionSource, Value};
use mapsql::evaluator::{DbParameter, RequestContext};
use mapsql::mapping::{MemoryRowSource, RowSource};
use mapsql::statement::{CommandType, DataSourceChoice, StatementRegistry};
use mapsql::{CommandExecutor, SqlMapper};

/// User statements covering dynamic tags, maps and multi-result reads
pub const USER_DOCUMENT: &str = r#"{
    "scope": "User",
    "result_maps": [
        {"id": "UserMap", "properties": [{"name": "name", "column": "user_name"}]}
    ],
    "multiple_result_maps": [
        {"id": "UserGraph", "results": [{}, {"property": "roles"}]}
    ],
    "statements": [
        {
            "id": "QueryParams",
            "tags": [
                {"tag": "Text", "text": "SELECT id, name FROM users"},
                {"tag": "Dynamic", "required": true, "trim": "Where", "children": [
                    {"tag": "Condition", "test": {"IsNotEmpty": "name"}, "children": [
                        {"tag": "Text", "text": " AND name = :name"}
                    ]},
                    {"tag": "Condition", "test": {"Expression": "ids != null"}, "children": [
                        {"tag": "Foreach", "collection": "ids", "item": "id", "open": " AND id IN (", "close": ")", "separator": ", ",
                         "children": [{"tag": "Text", "text": ":id"}]}
                    ]}
                ]},
                {"tag": "Include", "ref_id": "OrderBy"}
            ]
        },
        {"id": "OrderBy", "sql": " ORDER BY id"},
        {"id": "GetList", "sql": "SELECT id, user_name FROM users", "result_map": "UserMap"},
        {
            "id": "Update",
            "tags": [
                {"tag": "Text", "text": "UPDATE users"},
                {"tag": "Dynamic", "trim": "Set", "children": [
                    {"tag": "Condition", "test": {"IsProperty": "name"}, "children": [
                        {"tag": "Text", "text": " name = :name,"}
                    ]},
                    {"tag": "Condition", "test": {"IsProperty": "email"}, "children": [
                        {"tag": "Text", "text": " email = :email,"}
                    ]}
                ]},
                {"tag": "Text", "text": " WHERE id = :id"}
            ],
            "source_choice": "Write"
        },
        {"id": "Count", "sql": "SELECT COUNT(*) FROM users", "source_choice": "Read"},
        {"id": "GetGraph", "sql": "SELECT id, name FROM users; SELECT title FROM roles", "multiple_result_map": "UserGraph"},
        {"id": "Touch", "sql": "sp_touch_users", "command_type": "StoredProcedure"}
    ]
}"#;

pub fn registry() -> Arc<StatementRegistry> {
    let mut registry = StatementRegistry::new();
    registry.load_json(USER_DOCUMENT).unwrap();
    Arc::new(registry)
}

/// What the executor was asked to run
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub parameters: Vec<DbParameter>,
    pub command_type: CommandType,
    pub source_choice: DataSourceChoice,
}

/// Fake database: canned results, every request recorded
#[derive(Default)]
pub struct Recorder {
    pub rows: MemoryRowSource,
    pub scalar: Value,
    pub affected: i64,
    pub calls: Mutex<Vec<Call>>,
}

impl Recorder {
    pub fn with_rows(rows: MemoryRowSource) -> Self {
        Self { rows, ..Self::default() }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last(&self) -> Call {
        self.calls().pop().expect("no call recorded")
    }

    fn record(&self, ctx: &RequestContext) {
        self.calls.lock().unwrap().push(Call {
            sql: ctx.sql().to_string(),
            parameters: ctx.parameters().to_vec(),
            command_type: ctx.command_type(),
            source_choice: ctx.source_choice,
        });
    }
}

impl CommandExecutor for Recorder {
    fn execute(&self, ctx: &RequestContext) -> Result<i64, ExecutionSource> {
        self.record(ctx);
        Ok(self.affected)
    }

    fn execute_scalar(&self, ctx: &RequestContext) -> Result<Value, ExecutionSource> {
        self.record(ctx);
        Ok(self.scalar.clone())
    }

    fn execute_reader(&self, ctx: &RequestContext) -> Result<Box<dyn RowSource>, ExecutionSource> {
        self.record(ctx);
        Ok(Box::new(self.rows.clone()))
    }
}

pub fn mapper(recorder: Recorder) -> (Arc<SqlMapper>, Arc<Recorder>) {
    let recorder = Arc::new(recorder);
    let mapper = SqlMapper::new(registry(), Arc::clone(&recorder) as Arc<dyn CommandExecutor>);
    (Arc::new(mapper), recorder)
}

pub fn users() -> MemoryRowSource {
    MemoryRowSource::new(
        &["id", "name"],
        vec![
            vec![Value::Integer(1), Value::Text("ann".into())],
            vec![Value::Integer(2), Value::Text("bo".into())],
        ],
    )
}

pub fn names(call: &Call) -> Vec<&str> {
    call.parameters.iter().map(|p| p.name.as_str()).collect()
}
