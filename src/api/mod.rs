// src/api/mod.rs

pub mod games;
pub mod health;
pub mod users;

use std::sync::Arc;

use crate::{config::Config, db::Store, services::LoginService};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub login: LoginService,
    pub config: Config,
}
