pub mod auth;
pub mod billing;
pub mod errors;
pub mod models;
pub mod pdf;
pub mod routes;
pub mod state;
