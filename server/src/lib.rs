pub mod auth;
pub mod config;
pub mod db;
pub mod filters;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod policy;
pub mod registration;
pub mod routes;
pub mod state;
pub mod utils;
pub mod validation;
