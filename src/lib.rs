pub mod auth;
pub mod clerk;
pub mod config;
pub mod domain;
pub mod generation;
pub mod infrastructure;
pub mod observability;
pub mod payments;
pub mod usecases;
