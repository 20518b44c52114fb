//! User endpoints, laid out like [`crate::resources::todo`].

use serde_json::Value;
use url::form_urlencoded;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::key::{list_key, CacheKey};
use crate::operation::{MutationFn, QueryFn};
use crate::request::ApiRequest;
use crate::resources::{item_path, next_client_id, with_query};
use crate::types::{CreateUser, SortOrder, UpdateUser, User, UserListParams, UserOption, UserSortField};
use crate::validators::{user_form_schema, user_list_schema, user_schema, user_update_schema};

pub const USER_LIST_SENTINEL: &str = "users-list";
const USER_PATH: &str = "/users";

pub fn user_list_key(params: &UserListParams) -> CacheKey {
    list_key(USER_LIST_SENTINEL, params)
}

pub fn user_item_key(id: &str) -> CacheKey {
    CacheKey::single(format!("user-{id}"))
}

pub fn user_write_keys(id: &str) -> Vec<CacheKey> {
    vec![user_item_key(id), CacheKey::single(USER_LIST_SENTINEL)]
}

pub fn user_query(params: &UserListParams) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if let Some(name) = params.name.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("name", name);
    }
    if let Some(email) = params.email.as_deref().filter(|s| !s.is_empty()) {
        query.append_pair("email", email);
    }
    if let Some(sort_by) = params.sort_by {
        query.append_pair("_sort", sort_by.as_str());
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
    item_path(USER_PATH, id)
}

#[derive(Clone)]
pub struct UserService {
    client: ApiClient,
}

impl UserService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn list_request(&self, params: &UserListParams) -> ApiRequest {
        ApiRequest::new(with_query(USER_PATH, user_query(params))).response_schema(user_list_schema())
    }

    pub fn detail_request(&self, id: &str) -> ApiRequest {
        ApiRequest::new(detail_path(id)).response_schema(user_schema())
    }

    pub fn create_request(&self, input: &CreateUser) -> Result<ApiRequest, ApiError> {
        let mut request = ApiRequest::new(USER_PATH)
            .json(input)?
            .request_schema(user_form_schema())
            .response_schema(user_schema());
        if let Some(Value::Object(fields)) = request.payload.as_mut() {
            fields.insert("id".to_string(), Value::String(next_client_id()));
        }
        Ok(request)
    }

    pub fn update_request(&self, id: &str, input: &UpdateUser) -> Result<ApiRequest, ApiError> {
        Ok(ApiRequest::new(detail_path(id))
            .json(input)?
            .request_schema(user_update_schema())
            .response_schema(user_schema()))
    }

    pub async fn get_users(&self, params: &UserListParams) -> Result<Vec<User>, ApiError> {
        self.client.get(self.list_request(params)).await
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<User, ApiError> {
        self.client.get(self.detail_request(id)).await
    }

    pub async fn create_user(&self, input: &CreateUser) -> Result<User, ApiError> {
        self.client.post(self.create_request(input)?).await
    }

    pub async fn update_user(&self, id: &str, input: &UpdateUser) -> Result<User, ApiError> {
        self.client.put(self.update_request(id, input)?).await
    }

    pub async fn patch_user(&self, id: &str, input: &UpdateUser) -> Result<User, ApiError> {
        self.client.patch(self.update_request(id, input)?).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(ApiRequest::new(detail_path(id))).await
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<User>, ApiError> {
        self.get_users(&UserListParams {
            name: Some(query.to_string()),
            sort_by: Some(UserSortField::Name),
            sort_order: Some(SortOrder::Asc),
            ..UserListParams::default()
        })
        .await
    }

    /// Users as select options, ordered by name.
    pub async fn get_user_options(&self) -> Result<Vec<UserOption>, ApiError> {
        let users = self
            .get_users(&UserListParams {
                sort_by: Some(UserSortField::Name),
                sort_order: Some(SortOrder::Asc),
                ..UserListParams::default()
            })
            .await?;
        Ok(user_options(&users))
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let users = self
            .get_users(&UserListParams {
                email: Some(email.to_string()),
                ..UserListParams::default()
            })
            .await?;
        Ok(users.into_iter().next())
    }

    pub fn list(&self) -> QueryFn<UserListParams, Vec<User>> {
        let service = self.clone();
        QueryFn::new(
            move |params: UserListParams| {
                let service = service.clone();
                async move { service.get_users(&params).await }
            },
            user_list_key,
        )
    }

    pub fn detail(&self) -> QueryFn<String, User> {
        let service = self.clone();
        QueryFn::new(
            move |id: String| {
                let service = service.clone();
                async move { service.get_user_by_id(&id).await }
            },
            |id: &String| user_item_key(id),
        )
    }

    pub fn options(&self) -> QueryFn<(), Vec<UserOption>> {
        let service = self.clone();
        QueryFn::new(
            move |_: ()| {
                let service = service.clone();
                async move { service.get_user_options().await }
            },
            |_: &()| CacheKey::composite([USER_LIST_SENTINEL, "options"]),
        )
    }

    pub fn create(&self) -> MutationFn<CreateUser, User> {
        let service = self.clone();
        MutationFn::new(
            move |input: CreateUser| {
                let service = service.clone();
                async move { service.create_user(&input).await }
            },
            |_: &CreateUser| vec![CacheKey::single(USER_LIST_SENTINEL)],
        )
    }

    pub fn update(&self) -> MutationFn<(String, UpdateUser), User> {
        let service = self.clone();
        MutationFn::new(
            move |(id, input): (String, UpdateUser)| {
                let service = service.clone();
                async move { service.update_user(&id, &input).await }
            },
            |(id, _): &(String, UpdateUser)| user_write_keys(id),
        )
    }

    pub fn patch(&self) -> MutationFn<(String, UpdateUser), User> {
        let service = self.clone();
        MutationFn::new(
            move |(id, input): (String, UpdateUser)| {
                let service = service.clone();
                async move { service.patch_user(&id, &input).await }
            },
            |(id, _): &(String, UpdateUser)| user_write_keys(id),
        )
    }

    pub fn delete(&self) -> MutationFn<String, ()> {
        let service = self.clone();
        MutationFn::new(
            move |id: String| {
                let service = service.clone();
                async move { service.delete_user(&id).await }
            },
            |id: &String| user_write_keys(id),
        )
    }
}

/// Map users to `{value, label}` options sorted by name. Users whose id is
/// not numeric cannot be assigned and are skipped.
pub fn user_options(users: &[User]) -> Vec<UserOption> {
    let mut sorted: Vec<&User> = users.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
        .into_iter()
        .filter_map(|user| {
            let value = user.id.parse::<u64>().ok()?;
            Some(UserOption {
                value,
                label: format!("{} ({})", user.name, user.email),
            })
        })
        .collect()
}
