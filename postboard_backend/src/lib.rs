pub mod accounts;
pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod categories;
pub mod comments;
pub mod config;
pub mod database;
pub mod error;
pub mod pagination;
pub mod posts;
pub mod ratelimit;
pub mod reactions;
pub mod telemetry;
pub mod threading;
pub mod users;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
