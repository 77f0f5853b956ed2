//! Admin core: schema introspection, meta binding and resource CRUD over SQL databases,
//! with an axum adapter.

pub mod admin;
pub mod case;
pub mod codec;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod resource;
pub mod response;
pub mod roles;
pub mod routes;
pub mod schema;
pub mod sql;
pub mod state;
pub mod store;
pub mod validations;

pub use admin::Admin;
pub use config::{load_models, parse_models, AdminConfig, FieldDef, ModelDef};
pub use context::Context;
pub use db::Db;
pub use error::{AppError, CodecError, ConfigError, SchemaError};
pub use model::{is_zero, Model, Record};
pub use resource::{Decoded, FindMany, FindOne, Meta, MetaValue, MetaValues, Resource};
pub use roles::{Permission, PermissionMode};
pub use routes::{common_routes, resource_routes, router};
pub use schema::{Field, FieldKind, Registry, RelationshipKind, Schema};
pub use state::AppState;
pub use store::{ensure_database_exists, PgStore, SqliteStore, Store};
pub use validations::ValidationError;
