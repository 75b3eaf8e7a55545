//! Tracker lifecycle and handler tests
//!
//! Install/uninstall semantics, handler registration and removal, and the
//! query log.
//! Run with: cargo test --test tracker_tests

use querymock::{Client, Interceptable, Method, MockError, Statement, Tracker, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn mocked_client() -> (Arc<Client>, Tracker) {
    let client = Arc::new(Client::unconnected());
    let tracker = Tracker::new();
    tracker.install(&client).unwrap();
    (client, tracker)
}

#[tokio::test]
async fn test_install_swaps_the_transport_and_uninstall_restores_it() {
    let client = Arc::new(Client::unconnected());
    let original = client.transport().unwrap();

    let tracker = Tracker::new();
    tracker.install(&client).unwrap();
    assert!(tracker.is_installed().unwrap());
    assert!(!Arc::ptr_eq(&client.transport().unwrap(), &original));

    tracker.uninstall(&client).unwrap();
    assert!(!tracker.is_installed().unwrap());
    assert!(Arc::ptr_eq(&client.transport().unwrap(), &original));
}

#[tokio::test]
async fn test_install_twice_fails() {
    let (client, tracker) = mocked_client();
    let err = tracker.install(&client).unwrap_err();
    assert!(matches!(err, MockError::AlreadyInstalled));
}

#[tokio::test]
async fn test_uninstall_from_the_wrong_client_fails() {
    let (_client, tracker) = mocked_client();
    let stranger = Arc::new(Client::unconnected());

    let err = tracker.uninstall(&stranger).unwrap_err();
    assert!(matches!(err, MockError::WrongClient));
    assert!(tracker.is_installed().unwrap());
}

#[tokio::test]
async fn test_queries_are_recorded_in_arrival_order() {
    let (client, tracker) = mocked_client();
    tracker
        .on_query(|record, _step| record.respond(Vec::new()).unwrap())
        .unwrap();

    client
        .query(Statement::select("SELECT * FROM users"))
        .await
        .unwrap();
    client
        .query(Statement::insert("INSERT INTO users (name) VALUES (?)").bind("Alice"))
        .await
        .unwrap();

    let log = tracker.queries();
    assert_eq!(log.count().unwrap(), 2);

    let first = log.first().unwrap().unwrap();
    assert_eq!(first.sql(), "SELECT * FROM users");
    assert_eq!(first.method(), Method::Select);
    assert!(first.bindings().is_empty());

    let second = log.at(1).unwrap().unwrap();
    assert_eq!(second.sql(), "INSERT INTO users (name) VALUES (?)");
    assert_eq!(second.method(), Method::Insert);
    assert_eq!(second.bindings(), &[Value::Text("Alice".to_string())][..]);
}

#[tokio::test]
async fn test_handlers_fire_in_registration_order() {
    let (client, tracker) = mocked_client();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let order = Arc::clone(&seen);
    tracker
        .on_query(move |_record, _step| order.lock().unwrap().push("observer"))
        .unwrap();
    let order = Arc::clone(&seen);
    tracker
        .on_query(move |record, _step| {
            order.lock().unwrap().push("responder");
            record.respond(Vec::new()).unwrap();
        })
        .unwrap();

    client.query(Statement::select("SELECT 1")).await.unwrap();
    assert_eq!(*seen.lock().unwrap(), vec!["observer", "responder"]);
}

#[tokio::test]
async fn test_once_handler_fires_for_a_single_query() {
    let (client, tracker) = mocked_client();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    tracker
        .once_query(move |record, _step| {
            counter.fetch_add(1, Ordering::SeqCst);
            record
                .respond_json(serde_json::json!([{"id": 1}]))
                .unwrap();
        })
        .unwrap();
    tracker
        .on_query(|record, _step| {
            if !record.is_answered().unwrap() {
                record.respond(Vec::new()).unwrap();
            }
        })
        .unwrap();

    let first = client.query(Statement::select("SELECT 1")).await.unwrap();
    let second = client.query(Statement::select("SELECT 2")).await.unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(first.row_count(), 1);
    assert_eq!(second.row_count(), 0);
}

#[tokio::test]
async fn test_removed_handler_no_longer_fires() {
    let (client, tracker) = mocked_client();

    let id = tracker
        .on_query(|record, _step| {
            record
                .respond_json(serde_json::json!([{"from": "removed"}]))
                .unwrap();
        })
        .unwrap();

    let before = client.query(Statement::select("SELECT 1")).await.unwrap();
    assert_eq!(before.row_count(), 1);

    assert!(tracker.remove_handler(id).unwrap());
    tracker
        .on_query(|record, _step| record.respond(Vec::new()).unwrap())
        .unwrap();

    let after = client.query(Statement::select("SELECT 2")).await.unwrap();
    assert_eq!(after.row_count(), 0);
}

#[tokio::test]
async fn test_uninstall_resets_handlers_and_history() {
    let (client, tracker) = mocked_client();
    tracker
        .on_query(|record, _step| record.respond(Vec::new()).unwrap())
        .unwrap();

    client.query(Statement::select("SELECT 1")).await.unwrap();
    client.query(Statement::select("SELECT 2")).await.unwrap();
    assert_eq!(tracker.queries().count().unwrap(), 2);
    assert_eq!(tracker.handler_count().unwrap(), 1);

    tracker.uninstall(&client).unwrap();
    assert_eq!(tracker.queries().count().unwrap(), 0);
    assert_eq!(tracker.handler_count().unwrap(), 0);

    // A reinstalled tracker starts from scratch
    tracker.install(&client).unwrap();
    tracker
        .on_query(|record, _step| record.respond(Vec::new()).unwrap())
        .unwrap();
    client.query(Statement::select("SELECT 3")).await.unwrap();
    assert_eq!(tracker.queries().count().unwrap(), 1);
}

#[tokio::test]
async fn test_every_method_classification_is_reported() {
    let (client, tracker) = mocked_client();
    let methods = Arc::new(Mutex::new(Vec::new()));

    let collected = Arc::clone(&methods);
    tracker
        .on_query(move |record, _step| {
            collected.lock().unwrap().push(record.method());
            record.respond(Vec::new()).unwrap();
        })
        .unwrap();

    client.query(Statement::select("SELECT 1")).await.unwrap();
    client.query(Statement::insert("INSERT 1")).await.unwrap();
    client.query(Statement::update("UPDATE 1")).await.unwrap();
    client.query(Statement::del("DELETE 1")).await.unwrap();
    client.query(Statement::first("SELECT 2")).await.unwrap();
    client.query(Statement::pluck("SELECT 3")).await.unwrap();
    client.query(Statement::count("SELECT 4")).await.unwrap();
    client.query(Statement::raw("VACUUM")).await.unwrap();

    assert_eq!(
        *methods.lock().unwrap(),
        vec![
            Method::Select,
            Method::Insert,
            Method::Update,
            Method::Del,
            Method::First,
            Method::Pluck,
            Method::Count,
            Method::Raw,
        ]
    );
}

#[tokio::test]
async fn test_json_rows_come_back_typed() {
    let (client, tracker) = mocked_client();
    tracker
        .on_query(|record, _step| {
            record
                .respond_json(serde_json::json!([
                    {"id": 1, "name": "Alice", "active": true, "score": 9.5, "note": null}
                ]))
                .unwrap();
        })
        .unwrap();

    let result = client
        .query(Statement::select("SELECT * FROM users"))
        .await
        .unwrap();
    let row = result.first_row().unwrap();

    assert_eq!(row.get("id"), Some(&Value::Integer(1)));
    assert_eq!(row.get("name"), Some(&Value::Text("Alice".to_string())));
    assert_eq!(row.get("active"), Some(&Value::Boolean(true)));
    assert_eq!(row.get("score"), Some(&Value::Float(9.5)));
    assert_eq!(row.get("note"), Some(&Value::Null));
}

#[tokio::test]
async fn test_json_response_must_be_an_array_of_objects() {
    let (client, tracker) = mocked_client();
    tracker
        .on_query(|record, _step| {
            let err = record
                .respond_json(serde_json::json!({"not": "an array"}))
                .unwrap_err();
            assert!(matches!(err, MockError::TypeMismatch(_)));
            // The record is still answerable after the failed conversion
            record.respond(Vec::new()).unwrap();
        })
        .unwrap();

    let result = client.query(Statement::select("SELECT 1")).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_rejection_surfaces_as_query_failure() {
    let (client, tracker) = mocked_client();
    tracker
        .on_query(|record, _step| record.reject("duplicate key").unwrap())
        .unwrap();

    let err = client
        .query(Statement::update("UPDATE users SET name = ? WHERE id = ?").bind("Bob").bind(1))
        .await
        .unwrap_err();
    match err {
        MockError::QueryFailure(message) => assert_eq!(message, "duplicate key"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_responding_twice_fails_and_the_first_outcome_stands() {
    let (client, tracker) = mocked_client();
    tracker
        .on_query(|record, _step| {
            record
                .respond_json(serde_json::json!([{"winner": "first"}]))
                .unwrap();
            let err = record.reject("late rejection").unwrap_err();
            assert!(matches!(err, MockError::AlreadyResponded));
        })
        .unwrap();

    let result = client.query(Statement::select("SELECT 1")).await.unwrap();
    assert_eq!(result.row_count(), 1);
    assert_eq!(
        result.first_row().unwrap().get("winner"),
        Some(&Value::Text("first".to_string()))
    );
}

#[tokio::test]
async fn test_handler_may_change_registrations_from_inside_its_callback() {
    let (client, tracker) = mocked_client();

    let registrar = tracker.clone();
    tracker
        .once_query(move |record, _step| {
            // Dispatch holds no registry lock while callbacks run, so a
            // handler can register its successor mid-flight
            registrar
                .on_query(|record, _step| {
                    record
                        .respond_json(serde_json::json!([{"from": "inner"}]))
                        .unwrap();
                })
                .unwrap();
            record.respond(Vec::new()).unwrap();
        })
        .unwrap();

    let first = client.query(Statement::select("SELECT 1")).await.unwrap();
    assert!(first.is_empty());
    assert_eq!(tracker.handler_count().unwrap(), 1);

    let second = client.query(Statement::select("SELECT 2")).await.unwrap();
    assert_eq!(
        second.first_row().unwrap().get("from"),
        Some(&Value::Text("inner".to_string()))
    );
}
