use std::sync::Arc;

use crate::{config::AppConfig, db::OrmConn, notify::NotificationDispatcher};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub notifications: NotificationDispatcher,
}
