pub mod auth;
pub mod error;
pub mod middleware;
pub mod recipes;
pub mod routes;
pub mod serializers;
pub mod state;
pub mod tags;
