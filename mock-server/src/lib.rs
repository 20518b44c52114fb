//! In-memory JSON backend mirroring the taskboard HTTP surface.
//!
//! Behaves like a small json-server: records are free-form JSON objects with
//! a caller-supplied `id`, list endpoints understand field equality filters,
//! `<field>_like` substring filters, `_sort`/`_order` and `_page`/`_limit`.

use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Default page size applied when `_page` is given without `_limit`.
const DEFAULT_PAGE_SIZE: usize = 10;

/// Credentials served from `GET /auth`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password: "admin".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Store {
    pub auth: AuthConfig,
    pub todo: Vec<Value>,
    pub users: Vec<Value>,
    next_id: u64,
}

impl Store {
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            auth,
            ..Self::default()
        }
    }

    /// A store with a few users so a fresh server is usable by hand.
    pub fn seeded(auth: AuthConfig) -> Self {
        let users = vec![
            json!({"id": "1", "name": "Ada Lovelace", "email": "ada@example.com"}),
            json!({"id": "2", "name": "Grace Hopper", "email": "grace@example.com"}),
            json!({"id": "3", "name": "Alan Turing", "email": "alan@example.com"}),
        ];
        Self {
            auth,
            users,
            ..Self::default()
        }
    }

    fn records(&self, collection: Collection) -> &[Value] {
        match collection {
            Collection::Todo => &self.todo,
            Collection::Users => &self.users,
        }
    }

    fn records_mut(&mut self, collection: Collection) -> &mut Vec<Value> {
        match collection {
            Collection::Todo => &mut self.todo,
            Collection::Users => &mut self.users,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Collection {
    Todo,
    Users,
}

pub type Db = Arc<RwLock<Store>>;

type Reply = (StatusCode, Json<Value>);

pub fn app() -> Router {
    app_with(Store::default())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/auth", get(get_auth))
        .route("/todo", get(list_todos).post(create_todo))
        .route(
            "/todo/{id}",
            get(get_todo)
                .put(replace_todo)
                .patch(patch_todo)
                .delete(delete_todo),
        )
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user)
                .put(replace_user)
                .patch(patch_user)
                .delete(delete_user),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, store: Store) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(store)).await
}

async fn get_auth(State(db): State<Db>) -> Json<AuthConfig> {
    Json(db.read().await.auth.clone())
}

async fn list_todos(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> (HeaderMap, Json<Vec<Value>>) {
    list(&db, Collection::Todo, &params).await
}

async fn create_todo(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    create(&db, Collection::Todo, body).await
}

async fn get_todo(State(db): State<Db>, Path(id): Path<String>) -> Reply {
    fetch(&db, Collection::Todo, &id).await
}

async fn replace_todo(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    update(&db, Collection::Todo, &id, body, false).await
}

async fn patch_todo(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    update(&db, Collection::Todo, &id, body, true).await
}

async fn delete_todo(State(db): State<Db>, Path(id): Path<String>) -> Reply {
    remove(&db, Collection::Todo, &id).await
}

async fn list_users(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> (HeaderMap, Json<Vec<Value>>) {
    list(&db, Collection::Users, &params).await
}

async fn create_user(State(db): State<Db>, Json(body): Json<Value>) -> Reply {
    create(&db, Collection::Users, body).await
}

async fn get_user(State(db): State<Db>, Path(id): Path<String>) -> Reply {
    fetch(&db, Collection::Users, &id).await
}

async fn replace_user(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    update(&db, Collection::Users, &id, body, false).await
}

async fn patch_user(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Reply {
    update(&db, Collection::Users, &id, body, true).await
}

async fn delete_user(State(db): State<Db>, Path(id): Path<String>) -> Reply {
    remove(&db, Collection::Users, &id).await
}

async fn list(
    db: &Db,
    collection: Collection,
    params: &HashMap<String, String>,
) -> (HeaderMap, Json<Vec<Value>>) {
    let store = db.read().await;
    let mut items: Vec<Value> = store
        .records(collection)
        .iter()
        .filter(|record| matches_filters(record, params))
        .cloned()
        .collect();

    if let Some(field) = params.get("_sort") {
        items.sort_by(|a, b| compare_field(a.get(field), b.get(field)));
        if params.get("_order").map(String::as_str) == Some("desc") {
            items.reverse();
        }
    }

    let total = items.len();
    let limit = params.get("_limit").and_then(|v| v.parse::<usize>().ok());
    let page = params.get("_page").and_then(|v| v.parse::<usize>().ok());
    let items = match (page, limit) {
        (Some(page), limit) => {
            let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
            let start = page.saturating_sub(1).saturating_mul(limit);
            items.into_iter().skip(start).take(limit).collect()
        }
        (None, Some(limit)) => items.into_iter().take(limit).collect(),
        (None, None) => items,
    };

    debug!(?collection, total, returned = items.len(), "list");
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&total.to_string()) {
        headers.insert("x-total-count", value);
    }
    (headers, Json(items))
}

async fn create(db: &Db, collection: Collection, body: Value) -> Reply {
    let Value::Object(mut record) = body else {
        return bad_request("request body must be a JSON object");
    };

    let mut store = db.write().await;
    let id = match record.get("id").and_then(field_text) {
        Some(id) => id,
        None => {
            store.next_id += 1;
            let id = format!("gen-{}", store.next_id);
            record.insert("id".to_string(), Value::String(id.clone()));
            id
        }
    };

    let records = store.records_mut(collection);
    if records.iter().any(|r| has_id(r, &id)) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": format!("duplicate id {id}")})),
        );
    }
    let record = Value::Object(record);
    records.push(record.clone());
    (StatusCode::CREATED, Json(record))
}

async fn fetch(db: &Db, collection: Collection, id: &str) -> Reply {
    let store = db.read().await;
    match store.records(collection).iter().find(|r| has_id(r, id)) {
        Some(record) => (StatusCode::OK, Json(record.clone())),
        None => not_found(),
    }
}

async fn update(db: &Db, collection: Collection, id: &str, body: Value, merge: bool) -> Reply {
    let Value::Object(changes) = body else {
        return bad_request("request body must be a JSON object");
    };

    let mut store = db.write().await;
    let Some(record) = store.records_mut(collection).iter_mut().find(|r| has_id(r, id)) else {
        return not_found();
    };

    let original_id = record.get("id").cloned().unwrap_or(Value::String(id.to_string()));
    if merge {
        if let Value::Object(fields) = &mut *record {
            fields.extend(changes);
        }
    } else {
        *record = Value::Object(changes);
    }
    if let Value::Object(fields) = &mut *record {
        fields.insert("id".to_string(), original_id);
    }
    (StatusCode::OK, Json(record.clone()))
}

async fn remove(db: &Db, collection: Collection, id: &str) -> Reply {
    let mut store = db.write().await;
    let records = store.records_mut(collection);
    let before = records.len();
    records.retain(|r| !has_id(r, id));
    if records.len() == before {
        return not_found();
    }
    (StatusCode::OK, Json(json!({})))
}

fn not_found() -> Reply {
    (StatusCode::NOT_FOUND, Json(json!({})))
}

fn bad_request(message: &str) -> Reply {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"message": message, "errors": [message]})),
    )
}

fn has_id(record: &Value, id: &str) -> bool {
    record.get("id").and_then(field_text).as_deref() == Some(id)
}

/// Text form of a scalar field, used for query-string comparisons.
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn matches_filters(record: &Value, params: &HashMap<String, String>) -> bool {
    params
        .iter()
        .filter(|(key, _)| !key.starts_with('_'))
        .all(|(key, expected)| {
            if let Some(field) = key.strip_suffix("_like") {
                record
                    .get(field)
                    .and_then(field_text)
                    .is_some_and(|text| text.to_lowercase().contains(&expected.to_lowercase()))
            } else {
                record.get(key).and_then(field_text).as_deref() == Some(expected.as_str())
            }
        })
}

fn compare_field(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => field_text(x).cmp(&field_text(y)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_serializes_to_json() {
        let json = serde_json::to_value(AuthConfig::default()).unwrap();
        assert_eq!(json, json!({"username": "admin", "password": "admin"}));
    }

    #[test]
    fn like_filter_is_case_insensitive() {
        let record = json!({"title": "Quarterly Report"});
        let params = HashMap::from([("title_like".to_string(), "report".to_string())]);
        assert!(matches_filters(&record, &params));
    }

    #[test]
    fn equality_filter_compares_numbers_as_text() {
        let record = json!({"assignedUser": 2});
        let hit = HashMap::from([("assignedUser".to_string(), "2".to_string())]);
        let miss = HashMap::from([("assignedUser".to_string(), "3".to_string())]);
        assert!(matches_filters(&record, &hit));
        assert!(!matches_filters(&record, &miss));
    }

    #[test]
    fn control_params_are_not_filters() {
        let record = json!({"title": "x"});
        let params = HashMap::from([
            ("_sort".to_string(), "title".to_string()),
            ("_page".to_string(), "1".to_string()),
        ]);
        assert!(matches_filters(&record, &params));
    }

    #[test]
    fn missing_fields_sort_last() {
        let a = json!({"dueDate": "2030-01-01"});
        let b = json!({});
        assert_eq!(compare_field(a.get("dueDate"), b.get("dueDate")), Ordering::Less);
    }

    #[test]
    fn numbers_sort_numerically() {
        let a = json!({"n": 9});
        let b = json!({"n": 10});
        assert_eq!(compare_field(a.get("n"), b.get("n")), Ordering::Less);
    }

    #[test]
    fn seeded_store_has_users() {
        let store = Store::seeded(AuthConfig::default());
        assert_eq!(store.users.len(), 3);
        assert!(store.todo.is_empty());
    }
}
