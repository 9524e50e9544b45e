// End-to-end rendering of catalog statements through SqlMapper
mod common;

use common::{mapper, names, users, Recorder};
use mapsql::core::{ErrorKind, MapperOptions};
use mapsql::statement::{CommandType, DataSourceChoice};
use mapsql::{ParamBag, RequestContext, Value};

#[derive(Debug, Default, PartialEq)]
struct User {
    id: i64,
    name: String,
}

mapsql::impl_entity!(User { id: i64, name: String });

fn query(bag: ParamBag) -> (Vec<User>, common::Call) {
    let (mapper, recorder) = mapper(Recorder::with_rows(users()));
    let mut ctx = RequestContext::new("User", "QueryParams").with_request(bag);
    let found = mapper.query(&mut ctx).unwrap();
    (found, recorder.last())
}

#[test]
fn test_where_disappears_without_filters() {
    let (found, call) = query(ParamBag::new());
    assert_eq!(found.len(), 2);
    assert_eq!(call.sql, "SELECT id, name FROM users ORDER BY id");
    assert!(call.parameters.is_empty());
}

#[test]
fn test_filters_and_foreach_expand() {
    let (_, call) = query(ParamBag::new().with("ids", vec![7_i64, 9]));
    assert_eq!(call.sql, "SELECT id, name FROM users WHERE id IN (:id_0, :id_1) ORDER BY id");
    assert_eq!(names(&call), vec!["id_0", "id_1"]);
    assert_eq!(call.parameters[1].value, Value::Integer(9));

    let (_, call) = query(ParamBag::new().with("name", "ann").with("ids", vec![7_i64]));
    assert_eq!(
        call.sql,
        "SELECT id, name FROM users WHERE name = :name AND id IN (:id_0) ORDER BY id"
    );
    assert_eq!(names(&call), vec!["name", "id_0"]);
}

#[test]
fn test_empty_string_is_not_a_filter() {
    let (_, call) = query(ParamBag::new().with("name", ""));
    assert_eq!(call.sql, "SELECT id, name FROM users ORDER BY id");
}

#[test]
fn test_set_clause_drops_trailing_comma() {
    let (mapper, recorder) = mapper(Recorder { affected: 1, ..Recorder::default() });
    let bag = ParamBag::new().with("id", 4_i64).with("name", "cy");
    let affected = mapper.execute(&mut RequestContext::new("User", "Update").with_request(bag)).unwrap();
    assert_eq!(affected, 1);

    let call = recorder.last();
    assert_eq!(call.sql, "UPDATE users SET name = :name WHERE id = :id");
    assert_eq!(names(&call), vec!["name", "id"]);
    assert_eq!(call.source_choice, DataSourceChoice::Write);
}

#[test]
fn test_statement_metadata_reaches_executor() {
    let (mapper, recorder) = mapper(Recorder::default());
    mapper.execute(&mut RequestContext::new("User", "Touch")).unwrap();
    assert_eq!(recorder.last().command_type, CommandType::StoredProcedure);
}

#[test]
fn test_explicit_text_command_type_wins() {
    let (mapper, recorder) = mapper(Recorder::default());
    let mut ctx = RequestContext::new("User", "Touch").with_command_type(CommandType::Text);
    mapper.execute(&mut ctx).unwrap();
    assert_eq!(recorder.last().command_type, CommandType::Text);
}

#[test]
fn test_request_from_serializable_struct() {
    #[derive(serde::Serialize)]
    struct Filter {
        name: &'static str,
        ids: Vec<i64>,
    }

    let bag = ParamBag::from_serialize(&Filter { name: "bo", ids: vec![2] }).unwrap();
    let (_, call) = query(bag);
    assert_eq!(call.sql, "SELECT id, name FROM users WHERE name = :name AND id IN (:id_0) ORDER BY id");
    assert_eq!(call.parameters[0].value, Value::Text("bo".into()));
}

#[test]
fn test_ignore_case_lookup() {
    let (mapper, recorder) = mapper(Recorder::with_rows(users()));
    let options = MapperOptions { ignore_parameter_case: true, ..MapperOptions::default() };
    let mapper = std::sync::Arc::try_unwrap(mapper).unwrap().with_options(options);

    let mut ctx = RequestContext::new("User", "QueryParams").with_request(ParamBag::new().with("NAME", "ann"));
    let _: Vec<User> = mapper.query(&mut ctx).unwrap();
    assert_eq!(recorder.last().sql, "SELECT id, name FROM users WHERE name = :name ORDER BY id");
}

#[test]
fn test_invalid_collection_is_a_configuration_error() {
    let (mapper, _) = mapper(Recorder::default());
    let mut ctx = RequestContext::new("User", "QueryParams").with_request(ParamBag::new().with("ids", 3_i64));
    let err = mapper.query::<User>(&mut ctx).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}
