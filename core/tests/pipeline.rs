//! Pipeline, cache and mutation behavior against stub transports.

mod common;

use std::time::Duration;

use common::{canned_client, storage_token, Canned};
use serde_json::json;
use taskboard_core::resources::todo::todo_list_key;
use taskboard_core::{
    list_key, ApiError, AuthStorage, CreateTodo, ErrorKind, FetchOptions, HttpResponse,
    MutateOptions, QueryCache, TodoListParams, TodoPriority, TodoService, TodoStatus,
};

fn new_todo(title: &str) -> CreateTodo {
    CreateTodo {
        title: title.to_string(),
        description: "Write the quarterly report".to_string(),
        status: TodoStatus::Todo,
        due_date: "2999-06-30".to_string(),
        assigned_user: 1,
        priority: Some(TodoPriority::High),
        tags: vec!["work".to_string()],
    }
}

#[tokio::test]
async fn invalid_payload_never_reaches_transport() {
    let transport = Canned::new(HttpResponse::json(201, &json!({})));
    let (client, _) = canned_client(transport.clone());
    let todos = TodoService::new(client);

    let err = todos.create_todo(&new_todo("")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RequestValidation);
    assert_eq!(err.issues()[0].path, vec!["title".to_string()]);
    assert_eq!(err.issues()[0].message, "Title is required");
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_without_retry() {
    let transport = Canned::new(HttpResponse::json(401, &json!({"message": "expired"})));
    let (client, storage) = canned_client(transport.clone());
    storage.set("authToken", "mock-jwt-token").unwrap();

    let err = TodoService::new(client)
        .get_todos(&TodoListParams::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Authentication { status: 401, .. }));
    assert_eq!(err.code(), "AUTHENTICATION_ERROR");
    assert_eq!(transport.count(), 1);
    assert_eq!(storage_token(&storage).as_deref(), Some("mock-jwt-token"));
}

#[tokio::test]
async fn bad_request_keeps_server_errors() {
    let transport = Canned::new(HttpResponse::json(
        400,
        &json!({"errors": [{"field": "title", "message": "taken"}]}),
    ));
    let (client, _) = canned_client(transport);

    let err = TodoService::new(client)
        .create_todo(&new_todo("Report"))
        .await
        .unwrap_err();

    match err {
        ApiError::Validation { errors, response } => {
            assert_eq!(errors, vec![json!({"field": "title", "message": "taken"})]);
            assert_eq!(response.status, 400);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_list_is_a_response_validation_error() {
    let transport = Canned::new(HttpResponse::json(200, &json!([{"id": "1", "title": "t"}])));
    let (client, _) = canned_client(transport);

    let err = TodoService::new(client)
        .get_todos(&TodoListParams::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ResponseValidation);
    assert!(err.to_string().starts_with("Invalid data in 0 -> description."));
}

#[tokio::test]
async fn concurrent_subscribers_share_one_request() {
    let transport = Canned::delayed(HttpResponse::json(200, &json!([])), Duration::from_millis(20));
    let (client, _) = canned_client(transport.clone());
    let todos = TodoService::new(client);
    let cache = QueryCache::new();

    let params = TodoListParams {
        status: Some(TodoStatus::Done),
        ..TodoListParams::default()
    };
    let handles: Vec<_> = (0..3)
        .map(|_| cache.use_fetch(FetchOptions::new(todos.list(), params.clone())))
        .collect();
    for handle in &handles {
        handle.settled().await;
    }

    assert_eq!(transport.count(), 1);
    for handle in &handles {
        assert_eq!(handle.data(), Some(Vec::new()));
        assert!(!handle.is_loading());
    }
}

#[tokio::test]
async fn fetch_error_is_normalized() {
    let transport = Canned::new(HttpResponse::new(503, "Service Unavailable"));
    let (client, _) = canned_client(transport);
    let cache = QueryCache::new();

    let handle = cache.use_fetch(FetchOptions::new(
        TodoService::new(client).detail(),
        "42".to_string(),
    ));
    handle.settled().await;

    let error = handle.error().unwrap();
    assert_eq!(error.code, 503);
    assert_eq!(error.message, "Service Unavailable");
    assert_eq!(handle.data(), None);
}

#[tokio::test]
async fn failed_mutation_sets_error_and_keeps_data() {
    let ok = Canned::new(HttpResponse::json(
        201,
        &json!({
            "id": "1", "title": "Report", "description": "d",
            "dueDate": "2999-06-30", "assignedUser": 1,
        }),
    ));
    let (client, _) = canned_client(ok);
    let cache = QueryCache::new();
    let create = cache.use_mutate(MutateOptions::new(TodoService::new(client).create()));

    create.save(new_todo("Report")).await;
    let saved = create.data().unwrap();
    assert_eq!(saved.id, "1");

    create.save(new_todo("")).await;
    assert!(!create.is_loading());
    assert_eq!(create.error().as_deref(), Some("Request validation failed"));
    assert_eq!(create.data(), Some(saved));

    create.save(new_todo("Again")).await;
    assert_eq!(create.error(), None);
}

#[test]
fn list_key_ignores_field_order() {
    let a = list_key("todos-list", &json!({"status": "done", "assignedUser": 1}));
    let b = list_key("todos-list", &json!({"assignedUser": 1, "status": "done"}));
    assert_eq!(a, b);

    let typed = todo_list_key(&TodoListParams {
        assigned_user: Some(1),
        status: Some(TodoStatus::Done),
        ..TodoListParams::default()
    });
    assert_eq!(typed, a);
}
