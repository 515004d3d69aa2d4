pub mod callback;
pub mod connections;
pub mod daily;
pub mod deep_links;
pub mod health;
pub mod matches;
pub mod notifications;
pub mod pagination;
pub mod profiles;
pub mod recommendations;
pub mod ships;

use serde::Deserialize;
use uuid::Uuid;

/// `?user_id=` for GET endpoints; required with service credentials.
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(default)]
    pub user_id: Option<Uuid>,
}
