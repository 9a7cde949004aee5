//! API Module
//!
//! HTTP handlers and routing for the cache maintenance API.
//!
//! # Endpoints
//! - `PUT /set` - Store a payload for a query
//! - `POST /get` - Look up the payload for a query
//! - `POST /del` - Delete the entry for a query
//! - `POST /cleanup` - Remove expired entries
//! - `POST /clear` - Remove every entry
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
