//! Todo endpoints.
//!
//! # Design
//! Every endpoint is split the same way: a `*_request` builder produces the
//! `ApiRequest` (URL, payload, schemas) without doing any I/O, and an async
//! method runs it through the client. The `list`, `detail`, `create`,
//! `update`, `patch` and `delete` records pair those methods with their cache
//! keys for use with `QueryCache`.

use serde_json::Value;
use url::form_urlencoded;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::key::{list_key, CacheKey};
use crate::operation::{MutationFn, QueryFn};
use crate::request::ApiRequest;
use crate::resources::{item_path, next_client_id, with_query};
use crate::types::{CreateTodo, SortOrder, Todo, TodoListParams, TodoStats, TodoStatus, UpdateTodo};
use crate::validators::{todo_form_schema, todo_list_schema, todo_schema, todo_update_schema};

pub const TODO_LIST_SENTINEL: &str = "todos-list";
const TODO_PATH: &str = "/todo";

pub fn todo_list_key(params: &TodoListParams) -> CacheKey {
    list_key(TODO_LIST_SENTINEL, params)
}

pub fn todo_item_key(id: &str) -> CacheKey {
    CacheKey::single(format!("todo-{id}"))
}

/// Keys made stale by changing the todo `id`.
pub fn todo_write_keys(id: &str) -> Vec<CacheKey> {
    vec![todo_item_key(id), CacheKey::single(TODO_LIST_SENTINEL)]
}

/// Query string for the list endpoint. Unset, empty and zero filters are left out.
pub fn todo_query(params: &TodoListParams) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(status) = params.status {
        query.append_pair("status", status.as_str());
    }
    if let Some(priority) = params.priority {
        query.append_pair("priority", priority.as_str());
    }
    if let Some(user) = params.assigned_user.filter(|u| *u > 0) {
        query.append_pair("assignedUser", &user.to_string());
    }
    if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("title_like", search);
    }
    if let Some(sort_by) = params.sort_by.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("_sort", sort_by);
    }
    if let Some(order) = params.sort_order {
        query.append_pair("_order", order.as_str());
    }
    if let Some(page) = params.page.filter(|p| *p > 0) {
        query.append_pair("_page", &page.to_string());
    }
    if let Some(limit) = params.limit.filter(|l| *l > 0) {
        query.append_pair("_limit", &limit.to_string());
    }
    query.finish()
}

fn detail_path(id: &str) -> String {
    item_path(TODO_PATH, id)
}

#[derive(Clone)]
pub struct TodoService {
    client: ApiClient,
}

impl TodoService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn list_request(&self, params: &TodoListParams) -> ApiRequest {
        ApiRequest::new(with_query(TODO_PATH, todo_query(params))).response_schema(todo_list_schema())
    }

    pub fn detail_request(&self, id: &str) -> ApiRequest {
        ApiRequest::new(detail_path(id)).response_schema(todo_schema())
    }

    /// POST payload with a fresh client id.
    pub fn create_request(&self, input: &CreateTodo) -> Result<ApiRequest, ApiError> {
        let mut request = ApiRequest::new(TODO_PATH)
            .json(input)?
            .request_schema(todo_form_schema())
            .response_schema(todo_schema());
        if let Some(Value::Object(fields)) = request.payload.as_mut() {
            fields.insert("id".to_string(), Value::String(next_client_id()));
        }
        Ok(request)
    }

    pub fn update_request(&self, id: &str, input: &UpdateTodo) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::new(detail_path(id))
            .json(input)?
            .request_schema(todo_update_schema())
            .response_schema(todo_schema()))
    }

    pub fn delete_request(&self, id: &str) -> ApiRequest {
        ApiRequest::new(detail_path(id))
    }

    pub async fn get_todos(&self, params: &TodoListParams) -> Result<Vec<Todo>, ApiError> {
        self.client.get(self.list_request(params)).await
    }

    pub async fn get_todo_by_id(&self, id: &str) -> Result<Todo, ApiError> {
        self.client.get(self.detail_request(id)).await
    }

    pub async fn create_todo(&self, input: &CreateTodo) -> Result<Todo, ApiError> {
        self.client.post(self.create_request(input)?).await
    }

    /// Replace the todo with `input` (PUT).
    pub async fn update_todo(&self, id: &str, input: &UpdateTodo) -> Result<Todo, ApiError> {
        self.client.put(self.update_request(id, input)?).await
    }

    /// Merge `input` into the todo (PATCH).
    pub async fn patch_todo(&self, id: &str, input: &UpdateTodo) -> Result<Todo, ApiError> {
        self.client.patch(self.update_request(id, input)?).await
    }

    pub async fn delete_todo(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(self.delete_request(id)).await
    }

    pub async fn get_todos_by_status(&self, status: TodoStatus) -> Result<Vec<Todo>, ApiError> {
        self.get_todos(&TodoListParams {
            status: Some(status),
            sort_by: Some("dueDate".to_string()),
            sort_order: Some(SortOrder::Asc),
            ..TodoListParams::default()
        })
        .await
    }

    pub async fn get_todos_by_user(&self, user_id: u64) -> Result<Vec<Todo>, ApiError> {
        self.get_todos(&TodoListParams {
            assigned_user: Some(user_id),
            sort_by: Some("dueDate".to_string()),
            sort_order: Some(SortOrder::Asc),
            ..TodoListParams::default()
        })
        .await
    }

    pub async fn search_todos(&self, query: &str) -> Result<Vec<Todo>, ApiError> {
        self.get_todos(&TodoListParams {
            search: Some(query.to_string()),
            sort_by: Some("title".to_string()),
            sort_order: Some(SortOrder::Asc),
            ..TodoListParams::default()
        })
        .await
    }

    pub async fn get_todo_stats(&self) -> Result<TodoStats, ApiError> {
        let todos = self.get_todos(&TodoListParams::default()).await?;
        Ok(todo_stats(&todos))
    }

    pub fn list(&self) -> QueryFn<TodoListParams, Vec<Todo>> {
        let service = self.clone();
        QueryFn::new(
            move |params: TodoListParams| {
                let service = service.clone();
                async move { service.get_todos(&params).await }
            },
            todo_list_key,
        )
    }

    pub fn detail(&self) -> QueryFn<String, Todo> {
        let service = self.clone();
        QueryFn::new(
            move |id: String| {
                let service = service.clone();
                async move { service.get_todo_by_id(&id).await }
            },
            |id: &String| todo_item_key(id),
        )
    }

    pub fn create(&self) -> MutationFn<CreateTodo, Todo> {
        let service = self.clone();
        MutationFn::new(
            move |input: CreateTodo| {
                let service = service.clone();
                async move { service.create_todo(&input).await }
            },
            |_: &CreateTodo| vec![CacheKey::single(TODO_LIST_SENTINEL)],
        )
    }

    pub fn update(&self) -> MutationFn<(String, UpdateTodo), Todo> {
        let service = self.clone();
        MutationFn::new(
            move |(id, input): (String, UpdateTodo)| {
                let service = service.clone();
                async move { service.update_todo(&id, &input).await }
            },
            |(id, _): &(String, UpdateTodo)| todo_write_keys(id),
        )
    }

    pub fn patch(&self) -> MutationFn<(String, UpdateTodo), Todo> {
        let service = self.clone();
        MutationFn::new(
            move |(id, input): (String, UpdateTodo)| {
                let service = service.clone();
                async move { service.patch_todo(&id, &input).await }
            },
            |(id, _): &(String, UpdateTodo)| todo_write_keys(id),
        )
    }

    pub fn delete(&self) -> MutationFn<String, ()> {
        let service = self.clone();
        MutationFn::new(
            move |id: String| {
                let service = service.clone();
                async move { service.delete_todo(&id).await }
            },
            |id: &String| todo_write_keys(id),
        )
    }
}

/// Count `todos` by status and by priority. Todos without a priority only
/// count toward the total and status.
pub fn todo_stats(todos: &[Todo]) -> TodoStats {
    let mut stats = TodoStats {
        total: todos.len(),
        ..TodoStats::default()
    };
    for todo in todos {
        *stats.by_status.entry(todo.status.to_string()).or_default() += 1;
        if let Some(priority) = todo.priority {
            *stats.by_priority.entry(priority.to_string()).or_default() += 1;
        }
    }
    stats
}
