use crate::{config::Config, database::Database};

pub mod auth;
pub mod health;
pub mod plans;
pub mod users;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Config,
}
