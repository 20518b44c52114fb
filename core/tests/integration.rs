//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port and talks to it
//! through `ReqwestTransport`, wrapped so the requests actually sent can be
//! inspected. This checks that request building, query strings and response
//! schemas agree with the real backend.

mod common;

use common::{live_client, spawn_default_server, spawn_server};
use mock_server::{AuthConfig, Store};
use taskboard_core::resources::todo::{todo_item_key, TODO_LIST_SENTINEL};
use taskboard_core::{
    ApiError, AuthService, CacheKey, CreateTodo, CreateUser, FetchOptions, LoginError,
    MutateOptions, QueryCache, SortOrder, TodoListParams, TodoPriority, TodoService, TodoStatus,
    UpdateTodo, UpdateUser, UserOption, UserService,
};

fn new_todo(title: &str, status: TodoStatus, assigned_user: u64) -> CreateTodo {
    CreateTodo {
        title: title.to_string(),
        description: format!("{title} description"),
        status,
        due_date: "2999-03-01".to_string(),
        assigned_user,
        priority: Some(TodoPriority::Low),
        tags: Vec::new(),
    }
}

#[tokio::test]
async fn todo_crud_lifecycle() {
    let base_url = spawn_default_server().await;
    let (client, _, _) = live_client(&base_url);
    let todos = TodoService::new(client);

    assert!(todos.get_todos(&TodoListParams::default()).await.unwrap().is_empty());

    let created = todos
        .create_todo(&new_todo("Integration test", TodoStatus::Todo, 1))
        .await
        .unwrap();
    assert_eq!(created.title, "Integration test");
    assert_eq!(created.status, TodoStatus::Todo);
    assert!(created.id.parse::<i64>().is_ok());

    let fetched = todos.get_todo_by_id(&created.id).await.unwrap();
    assert_eq!(fetched, created);

    let patched = todos
        .patch_todo(
            &created.id,
            &UpdateTodo {
                status: Some(TodoStatus::InProgress),
                ..UpdateTodo::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(patched.status, TodoStatus::InProgress);
    assert_eq!(patched.title, "Integration test");

    let replaced = todos
        .update_todo(
            &created.id,
            &UpdateTodo {
                title: Some("Replaced".to_string()),
                description: Some("All fields sent".to_string()),
                status: Some(TodoStatus::Done),
                due_date: Some("2999-04-01".to_string()),
                assigned_user: Some(2),
                priority: None,
                tags: Some(vec!["x".to_string()]),
            },
        )
        .await
        .unwrap();
    assert_eq!(replaced.id, created.id);
    assert_eq!(replaced.title, "Replaced");
    assert_eq!(replaced.priority, None);
    assert_eq!(replaced.tags, vec!["x".to_string()]);

    todos.delete_todo(&created.id).await.unwrap();
    let err = todos.get_todo_by_id(&created.id).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(err.to_string(), "Resource not found");
}

#[tokio::test]
async fn filters_become_the_exact_query_string() {
    let base_url = spawn_default_server().await;
    let (client, transport, _) = live_client(&base_url);
    let todos = TodoService::new(client);

    todos.create_todo(&new_todo("Monthly report", TodoStatus::Done, 1)).await.unwrap();
    todos.create_todo(&new_todo("Report draft", TodoStatus::Todo, 1)).await.unwrap();
    todos.create_todo(&new_todo("Groceries", TodoStatus::Done, 2)).await.unwrap();

    let found = todos
        .get_todos(&TodoListParams {
            status: Some(TodoStatus::Done),
            search: Some("report".to_string()),
            ..TodoListParams::default()
        })
        .await
        .unwrap();

    assert_eq!(
        transport.urls().last().map(String::as_str),
        Some(format!("{base_url}/todo?status=done&title_like=report").as_str())
    );
    let titles: Vec<&str> = found.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Monthly report"]);

    let mine = todos.get_todos_by_user(2).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].title, "Groceries");

    let stats = todos.get_todo_stats().await.unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_status.get("done"), Some(&2));
    assert_eq!(stats.by_priority.get("low"), Some(&3));
}

#[tokio::test]
async fn sorted_pages() {
    let base_url = spawn_default_server().await;
    let (client, _, _) = live_client(&base_url);
    let todos = TodoService::new(client);

    for title in ["b", "c", "a"] {
        todos.create_todo(&new_todo(title, TodoStatus::Todo, 1)).await.unwrap();
    }
    let page = todos
        .get_todos(&TodoListParams {
            sort_by: Some("title".to_string()),
            sort_order: Some(SortOrder::Desc),
            page: Some(1),
            limit: Some(2),
            ..TodoListParams::default()
        })
        .await
        .unwrap();
    let titles: Vec<&str> = page.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["c", "b"]);
}

#[tokio::test]
async fn delete_invalidates_item_and_lists() {
    let base_url = spawn_default_server().await;
    let (client, transport, _) = live_client(&base_url);
    let todos = TodoService::new(client);
    let first = todos.create_todo(&new_todo("first", TodoStatus::Todo, 1)).await.unwrap();
    todos.create_todo(&new_todo("second", TodoStatus::Done, 1)).await.unwrap();

    let cache = QueryCache::new();
    let all = cache.use_fetch(FetchOptions::new(todos.list(), TodoListParams::default()));
    let open = cache.use_fetch(FetchOptions::new(
        todos.list(),
        TodoListParams {
            status: Some(TodoStatus::Todo),
            ..TodoListParams::default()
        },
    ));
    let detail = cache.use_fetch(FetchOptions::new(todos.detail(), first.id.clone()));
    all.settled().await;
    open.settled().await;
    detail.settled().await;
    assert_eq!(all.data().map(|t| t.len()), Some(2));
    assert_eq!(open.data().map(|t| t.len()), Some(1));
    assert!(cache.has_data(&todo_item_key(&first.id)));

    let delete = cache.use_mutate(MutateOptions::new(todos.delete()));
    assert_eq!(
        todos.delete().get_key(&first.id),
        vec![todo_item_key(&first.id), CacheKey::single(TODO_LIST_SENTINEL)]
    );
    let before = transport.count();
    delete.save(first.id.clone()).await;
    assert_eq!(delete.error(), None);

    assert_eq!(all.data(), None);
    assert_eq!(open.data(), None);
    assert_eq!(detail.data(), None);

    all.settled().await;
    open.settled().await;
    detail.settled().await;

    // delete + one refetch per invalidated entry
    assert_eq!(transport.count(), before + 4);
    assert_eq!(all.data().map(|t| t.len()), Some(1));
    assert_eq!(open.data().map(|t| t.len()), Some(0));
    assert_eq!(detail.error().map(|e| e.code), Some(404));
}

#[tokio::test]
async fn create_through_mutation_refreshes_list() {
    let base_url = spawn_default_server().await;
    let (client, _, _) = live_client(&base_url);
    let todos = TodoService::new(client);
    let cache = QueryCache::new();

    let list = cache.use_fetch(
        FetchOptions::new(todos.list(), TodoListParams::default())
            .transform(|items: &Vec<taskboard_core::Todo>| items.len()),
    );
    list.settled().await;
    assert_eq!(list.transformed_data(), Some(0));

    let create = cache.use_mutate(MutateOptions::new(todos.create()));
    create.save(new_todo("via mutation", TodoStatus::Todo, 3)).await;
    let created = create.data().unwrap();

    list.settled().await;
    assert_eq!(list.transformed_data(), Some(1));
    assert_eq!(list.data().unwrap()[0].id, created.id);
}

#[tokio::test]
async fn users_and_options() {
    let base_url = spawn_server(Store::seeded(AuthConfig::default())).await;
    let (client, _, _) = live_client(&base_url);
    let users = UserService::new(client);

    let options = users.get_user_options().await.unwrap();
    assert_eq!(
        options.first(),
        Some(&UserOption {
            value: 1,
            label: "Ada Lovelace (ada@example.com)".to_string(),
        })
    );
    assert_eq!(options.len(), 3);

    let created = users
        .create_user(&CreateUser {
            name: "Barbara Liskov".to_string(),
            email: "barbara@example.com".to_string(),
        })
        .await
        .unwrap();
    let by_email = users.get_user_by_email("barbara@example.com").await.unwrap();
    assert_eq!(by_email, Some(created.clone()));
    assert_eq!(users.get_user_by_email("nobody@example.com").await.unwrap(), None);

    let renamed = users
        .patch_user(
            &created.id,
            &UpdateUser {
                name: Some("B. Liskov".to_string()),
                email: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.email, "barbara@example.com");

    let found = users.search_users("B. Liskov").await.unwrap();
    assert_eq!(found.len(), 1);

    let err = users
        .create_user(&CreateUser {
            name: "x".to_string(),
            email: "not-an-email".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.issues()[0].message, "Please enter a valid email address");

    users.delete_user(&created.id).await.unwrap();
    assert!(users.get_user_by_id(&created.id).await.is_err());
}

#[tokio::test]
async fn login_stores_session_and_sends_token() {
    let auth_config = AuthConfig {
        username: "demo".to_string(),
        password: "s3cret".to_string(),
    };
    let base_url = spawn_server(Store::new(auth_config)).await;
    let (client, transport, _) = live_client(&base_url);
    let auth = AuthService::new(client.clone());

    let err = auth.login("demo", "wrong").await.unwrap_err();
    assert!(matches!(err, LoginError::InvalidCredentials));
    assert_eq!(auth.restore_session(), None);

    let user = auth.login("demo", "s3cret").await.unwrap();
    assert_eq!(user.email, "demo@example.com");
    assert_eq!(auth.restore_session(), Some(user));

    TodoService::new(client)
        .get_todos(&TodoListParams::default())
        .await
        .unwrap();
    let last = transport.requests.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last.header("Authorization"), Some("Bearer mock-jwt-token"));

    auth.logout().unwrap();
    assert_eq!(auth.restore_session(), None);
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (client, _, _) = live_client(&format!("http://{addr}"));
    let auth = AuthService::new(client.clone());
    assert!(!auth
        .authenticate(&taskboard_core::AuthCredentials {
            username: "admin".to_string(),
            password: "admin".to_string(),
        })
        .await);

    let err = TodoService::new(client)
        .get_todos(&TodoListParams::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NETWORK_ERROR");
    assert_eq!(err.status(), 0);
}
