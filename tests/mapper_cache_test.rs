// Row mapper cache: single compilation under contention, invalidation, keys
mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{mapper, users, Recorder};
use mapsql::mapping::MemoryRowSource;
use mapsql::{ParamBag, RequestContext, Value};

#[derive(Debug, Default, PartialEq)]
struct User {
    id: i64,
    name: String,
}

#[derive(Debug, Default, PartialEq)]
struct UserName {
    name: String,
}

mapsql::impl_entity!(User { id: i64, name: String });
mapsql::impl_entity!(UserName { name: String });

const THREADS: usize = 8;

#[test]
fn test_concurrent_first_use_compiles_once() {
    let (mapper, _) = mapper(Recorder::with_rows(users()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let mapper = Arc::clone(&mapper);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut ctx = RequestContext::new("User", "QueryParams");
                mapper.query::<User>(&mut ctx).unwrap()
            })
        })
        .collect();

    for handle in handles {
        let found = handle.join().unwrap();
        assert_eq!(found, vec![User { id: 1, name: "ann".into() }, User { id: 2, name: "bo".into() }]);
    }
    assert_eq!(mapper.cache().compilations(), 1);
    assert_eq!(mapper.cache().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_async_first_use_compiles_once() {
    let (mapper, _) = mapper(Recorder::with_rows(users()));
    let mut tasks = Vec::new();
    for _ in 0..THREADS {
        let mapper = Arc::clone(&mapper);
        tasks.push(tokio::spawn(async move {
            let mut ctx = RequestContext::new("User", "QueryParams");
            mapper.query_async::<User>(&mut ctx).await.unwrap().len()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), 2);
    }
    assert_eq!(mapper.cache().compilations(), 1);
}

#[test]
fn test_result_map_renames_columns() {
    let rows = MemoryRowSource::new(&["id", "user_name"], vec![vec![Value::Integer(5), Value::Text("dee".into())]]);
    let (mapper, _) = mapper(Recorder::with_rows(rows));
    let found: Vec<User> = mapper.query(&mut RequestContext::new("User", "GetList")).unwrap();
    assert_eq!(found, vec![User { id: 5, name: "dee".into() }]);
}

#[test]
fn test_target_type_is_part_of_the_key() {
    let (mapper, _) = mapper(Recorder::with_rows(users()));
    let _: Vec<User> = mapper.query(&mut RequestContext::new("User", "QueryParams")).unwrap();
    let names: Vec<UserName> = mapper.query(&mut RequestContext::new("User", "QueryParams")).unwrap();
    assert_eq!(names[1].name, "bo");
    assert_eq!(mapper.cache().compilations(), 2);

    let _: Vec<User> = mapper.query(&mut RequestContext::new("User", "QueryParams")).unwrap();
    assert_eq!(mapper.cache().compilations(), 2);
}

#[test]
fn test_invalidate_statement_forces_recompile() {
    let (mapper, _) = mapper(Recorder::with_rows(users()));
    let _: Vec<User> = mapper.query(&mut RequestContext::new("User", "QueryParams")).unwrap();
    let _: Vec<UserName> = mapper.query(&mut RequestContext::from_sql("SELECT name FROM users")).unwrap();
    assert_eq!(mapper.cache().len(), 2);

    mapper.invalidate_statement("User.QueryParams");
    assert_eq!(mapper.cache().len(), 1);

    let _: Vec<User> = mapper.query(&mut RequestContext::new("User", "QueryParams")).unwrap();
    assert_eq!(mapper.cache().len(), 2);
    assert_eq!(mapper.cache().compilations(), 3);
}

#[test]
fn test_literal_sql_gets_its_own_entry() {
    let (mapper, _) = mapper(Recorder::with_rows(users()));
    let _: Vec<User> = mapper.query(&mut RequestContext::from_sql("SELECT id, name FROM users")).unwrap();
    let _: Vec<User> = mapper.query(&mut RequestContext::from_sql("SELECT id, name FROM staff")).unwrap();
    let _: Vec<User> = mapper.query(&mut RequestContext::from_sql("SELECT id, name FROM users")).unwrap();
    assert_eq!(mapper.cache().compilations(), 2);
}

#[test]
fn test_dynamic_rows() {
    let (mapper, _) = mapper(Recorder::with_rows(users()));
    let rows: Vec<ParamBag> = mapper.query(&mut RequestContext::new("User", "QueryParams")).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get("id"), Some(&Value::Integer(2)));
    assert_eq!(rows[1].get("name"), Some(&Value::Text("bo".into())));

    let first: Option<ParamBag> = mapper.query_single(&mut RequestContext::new("User", "QueryParams")).unwrap();
    assert_eq!(first.unwrap().get("name"), Some(&Value::Text("ann".into())));

    let renamed = MemoryRowSource::new(&["id", "user_name"], vec![vec![Value::Integer(5), Value::Text("dee".into())]]);
    let (mapped, _) = common::mapper(Recorder::with_rows(renamed));
    let rows: Vec<ParamBag> = mapped.query(&mut RequestContext::new("User", "GetList")).unwrap();
    assert_eq!(rows[0].get("name"), Some(&Value::Text("dee".into())));
}

#[tokio::test]
async fn test_dynamic_rows_async() {
    let (mapper, _) = mapper(Recorder::with_rows(users()));
    let rows: Vec<ParamBag> = mapper.query_async(&mut RequestContext::new("User", "QueryParams")).await.unwrap();
    let names: Vec<_> = rows.iter().filter_map(|row| row.get("name")).cloned().collect();
    assert_eq!(names, vec![Value::Text("ann".into()), Value::Text("bo".into())]);

    let first: Option<ParamBag> = mapper
        .query_single_async(&mut RequestContext::from_sql("SELECT id, name FROM users"))
        .await
        .unwrap();
    assert_eq!(first.unwrap().get("id"), Some(&Value::Integer(1)));
}
