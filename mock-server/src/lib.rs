use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Option<i32>,
    pub name: Option<String>,
    pub is_man: Option<bool>,
    pub image_name: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<i32, User>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/user/list", get(list_users))
        .route("/user/add", post(add_user_part))
        .route("/user/addWithImage", post(add_user_with_image))
        .route("/user/v2/add", post(add_user_json))
        .route("/user/update", put(update_user))
        .route("/user/{id}", delete(delete_user))
        .route("/status/{code}", get(echo_status))
        .route("/delay/{ms}", get(delay))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    let users = db.read().await;
    let mut list: Vec<User> = users.values().cloned().collect();
    list.sort_by_key(|u| u.id);
    Json(list)
}

/// Parts of a multipart upload the user endpoints care about.
#[derive(Default)]
struct UserParts {
    user: Option<User>,
    image_filename: Option<String>,
}

async fn read_parts(mut multipart: Multipart) -> Result<UserParts, StatusCode> {
    let mut parts = UserParts::default();
    while let Some(field) = multipart.next_field().await.map_err(|_| StatusCode::BAD_REQUEST)? {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
        match name.as_str() {
            "user" => {
                let user = serde_json::from_slice(&bytes).map_err(|_| StatusCode::BAD_REQUEST)?;
                parts.user = Some(user);
            }
            "image" => {
                debug!(bytes = bytes.len(), "image part received");
                parts.image_filename = Some(filename.unwrap_or(name));
            }
            _ => {}
        }
    }
    Ok(parts)
}

async fn store(db: &Db, user: User) -> Result<Json<User>, StatusCode> {
    let id = user.id.ok_or(StatusCode::BAD_REQUEST)?;
    db.write().await.insert(id, user.clone());
    debug!(id, "user stored");
    Ok(Json(user))
}

async fn add_user_part(State(db): State<Db>, multipart: Multipart) -> Result<Json<User>, StatusCode> {
    let parts = read_parts(multipart).await?;
    let user = parts.user.ok_or(StatusCode::BAD_REQUEST)?;
    store(&db, user).await
}

async fn add_user_with_image(
    State(db): State<Db>,
    multipart: Multipart,
) -> Result<Json<User>, StatusCode> {
    let parts = read_parts(multipart).await?;
    let mut user = parts.user.ok_or(StatusCode::BAD_REQUEST)?;
    user.image_name = Some(parts.image_filename.ok_or(StatusCode::BAD_REQUEST)?);
    store(&db, user).await
}

async fn add_user_json(State(db): State<Db>, Json(user): Json<User>) -> Result<Json<User>, StatusCode> {
    store(&db, user).await
}

/// Overwrites name, isMan and imageName of the stored user (creating it if
/// absent) and echoes the request body.
async fn update_user(State(db): State<Db>, Json(input): Json<User>) -> Result<Json<User>, StatusCode> {
    let id = input.id.ok_or(StatusCode::BAD_REQUEST)?;
    let mut users = db.write().await;
    let stored = users.entry(id).or_insert_with(|| User {
        id: Some(id),
        ..Default::default()
    });
    stored.name = input.name.clone();
    stored.is_man = input.is_man;
    stored.image_name = input.image_name.clone();
    Ok(Json(input))
}

/// Removes the user, answering with an empty user when there was none.
async fn delete_user(State(db): State<Db>, Path(id): Path<i32>) -> Json<User> {
    Json(db.write().await.remove(&id).unwrap_or_default())
}

async fn echo_status(Path(code): Path<u16>) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, Json(serde_json::json!({ "status": code }))))
}

async fn delay(Path(ms): Path<u64>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "delayed": ms }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_serializes_camel_case() {
        let user = User {
            id: Some(1),
            name: Some("Tom".to_string()),
            is_man: Some(true),
            image_name: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Tom");
        assert_eq!(json["isMan"], true);
        assert!(json["imageName"].is_null());
    }

    #[test]
    fn user_fields_are_all_optional() {
        let user: User = serde_json::from_str("{}").unwrap();
        assert_eq!(user, User::default());
    }

    #[test]
    fn user_accepts_camel_case_input() {
        let user: User =
            serde_json::from_str(r#"{"id":2,"name":"Ann","isMan":false,"imageName":"a.png"}"#).unwrap();
        assert_eq!(user.id, Some(2));
        assert_eq!(user.is_man, Some(false));
        assert_eq!(user.image_name.as_deref(), Some("a.png"));
    }
}
