//! Concrete payload schemas for the todo, user and auth resources.

use serde_json::json;

use crate::schema::{Field, Schema};

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 3;
pub const MAX_TITLE_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const MAX_NAME_LENGTH: usize = 100;

const TODO_STATUSES: [&str; 3] = ["todo", "inProgress", "done"];
const TODO_PRIORITIES: [&str; 2] = ["low", "high"];

/// Outbound payload for creating or replacing a todo.
pub fn todo_form_schema() -> Schema {
    Schema::object(vec![
        Field::required(
            "title",
            Schema::string()
                .min_len(1, "Title is required")
                .max_len(
                    MAX_TITLE_LENGTH,
                    format!("Title must be less than {MAX_TITLE_LENGTH} characters"),
                ),
        ),
        Field::required(
            "description",
            Schema::string()
                .min_len(1, "Description is required")
                .max_len(
                    MAX_DESCRIPTION_LENGTH,
                    format!("Description must be less than {MAX_DESCRIPTION_LENGTH} characters"),
                ),
        ),
        Field::required(
            "dueDate",
            Schema::string()
                .min_len(1, "Due date is required")
                .date("Invalid date format")
                .not_past("Due date cannot be in the past"),
        ),
        Field::required(
            "assignedUser",
            Schema::integer_min(1, "Assigned user is required"),
        ),
        Field::optional("priority", Schema::enumeration(TODO_PRIORITIES)),
        Field::optional("tags", Schema::array(Schema::string())),
        Field::with_default("status", Schema::enumeration(TODO_STATUSES), json!("todo")),
    ])
}

/// Outbound partial update. Same field rules as the form, every field
/// optional, and an existing overdue date may be sent back unchanged.
pub fn todo_update_schema() -> Schema {
    Schema::object(vec![
        Field::optional(
            "title",
            Schema::string()
                .min_len(1, "Title is required")
                .max_len(
                    MAX_TITLE_LENGTH,
                    format!("Title must be less than {MAX_TITLE_LENGTH} characters"),
                ),
        ),
        Field::optional(
            "description",
            Schema::string().max_len(
                MAX_DESCRIPTION_LENGTH,
                format!("Description must be less than {MAX_DESCRIPTION_LENGTH} characters"),
            ),
        ),
        Field::optional("dueDate", Schema::string().date("Invalid date format")),
        Field::optional(
            "assignedUser",
            Schema::integer_min(1, "Assigned user is required"),
        ),
        Field::optional("priority", Schema::enumeration(TODO_PRIORITIES)),
        Field::optional("tags", Schema::array(Schema::string())),
        Field::optional("status", Schema::enumeration(TODO_STATUSES)),
    ])
}

/// Inbound todo record. Past due dates are legal here; only the form rejects them.
pub fn todo_schema() -> Schema {
    Schema::object(vec![
        Field::required("id", Schema::string()),
        Field::required("title", Schema::string()),
        Field::required("description", Schema::string()),
        Field::with_default("status", Schema::enumeration(TODO_STATUSES), json!("todo")),
        Field::required("dueDate", Schema::string().date("Invalid date format")),
        Field::required("assignedUser", Schema::integer()),
        Field::optional("priority", Schema::enumeration(TODO_PRIORITIES)),
        Field::optional("tags", Schema::array(Schema::string())),
        Field::optional("createdBy", Schema::integer()),
        Field::optional("createdDate", Schema::string()),
        Field::optional("modifiedBy", Schema::nullable(Schema::integer())),
        Field::optional("modifiedDate", Schema::nullable(Schema::string())),
        Field::optional("isDeleted", Schema::Boolean),
    ])
}

pub fn todo_list_schema() -> Schema {
    Schema::array(todo_schema())
}

pub fn user_form_schema() -> Schema {
    Schema::object(vec![
        Field::required(
            "name",
            Schema::string()
                .min_len(1, "Name is required")
                .max_len(
                    MAX_NAME_LENGTH,
                    format!("Name must be less than {MAX_NAME_LENGTH} characters"),
                ),
        ),
        Field::required(
            "email",
            Schema::string()
                .min_len(1, "Email is required")
                .email("Please enter a valid email address"),
        ),
    ])
}

pub fn user_update_schema() -> Schema {
    Schema::object(vec![
        Field::optional(
            "name",
            Schema::string()
                .min_len(1, "Name is required")
                .max_len(
                    MAX_NAME_LENGTH,
                    format!("Name must be less than {MAX_NAME_LENGTH} characters"),
                ),
        ),
        Field::optional(
            "email",
            Schema::string().email("Please enter a valid email address"),
        ),
    ])
}

pub fn user_schema() -> Schema {
    Schema::object(vec![
        Field::required("id", Schema::string()),
        Field::required("name", Schema::string()),
        Field::required("email", Schema::string()),
    ])
}

pub fn user_list_schema() -> Schema {
    Schema::array(user_schema())
}

pub fn auth_response_schema() -> Schema {
    Schema::object(vec![
        Field::required("username", Schema::string()),
        Field::required("password", Schema::string()),
    ])
}

pub fn login_form_schema() -> Schema {
    Schema::object(vec![
        Field::required(
            "username",
            Schema::string()
                .min_len(1, "Username is required")
                .min_len(
                    MIN_USERNAME_LENGTH,
                    format!("Username must be at least {MIN_USERNAME_LENGTH} characters"),
                ),
        ),
        Field::required(
            "password",
            Schema::string()
                .min_len(1, "Password is required")
                .min_len(
                    MIN_PASSWORD_LENGTH,
                    format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
                ),
        ),
    ])
}
