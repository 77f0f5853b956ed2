//! The admin: registry, database session and resources by model name.

use crate::config::{load_models, AdminConfig, ModelDef};
use crate::context::Context;
use crate::db::Db;
use crate::error::{AppError, ConfigError, SchemaError};
use crate::migration;
use crate::model::Model;
use crate::resource::Resource;
use crate::schema::Registry;
use crate::store::{ensure_database_exists, PgStore, SqliteStore, Store};
use crate::validations;
use indexmap::IndexMap;
use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;

pub struct Admin {
    config: AdminConfig,
    registry: Arc<Registry>,
    db: Db,
    resources: IndexMap<String, Arc<Resource>>,
}

impl Admin {
    /// Builds an admin over `store`, with `validations:validate` installed.
    pub fn new(store: Arc<dyn Store>, registry: Arc<Registry>, config: AdminConfig) -> Self {
        let db = Db::new(store, registry.clone());
        validations::register_callbacks(db.callbacks());
        Admin {
            config,
            registry,
            db,
            resources: IndexMap::new(),
        }
    }

    /// Opens the store named by `config.database_url` (PostgreSQL or SQLite) and registers the
    /// models of `config.models_path`, if any.
    pub async fn connect(config: AdminConfig) -> Result<Self, AppError> {
        let url = config.database_url.as_str();
        let store: Arc<dyn Store> = if url.starts_with("postgres") {
            ensure_database_exists(url).await?;
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(url)
                .await?;
            Arc::new(PgStore::new(pool))
        } else if url == "sqlite::memory:" {
            Arc::new(SqliteStore::memory().await?)
        } else if url.starts_with("sqlite:") {
            let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .connect_with(opts)
                .await?;
            Arc::new(SqliteStore::new(pool))
        } else {
            return Err(ConfigError::Env {
                key: "DATABASE_URL",
                reason: format!("unsupported database url '{}'", url),
            }
            .into());
        };

        let registry = Arc::new(Registry::new());
        if let Some(path) = &config.models_path {
            for def in load_models(path)? {
                registry.register(def)?;
            }
        }
        tracing::info!(models = registry.model_names().len(), "admin connected");
        Ok(Admin::new(store, registry, config))
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn register(&self, def: ModelDef) -> Result<(), ConfigError> {
        self.registry.register(def)
    }

    pub fn register_model<M: Model>(&self) -> Result<(), ConfigError> {
        self.registry.register_model::<M>()
    }

    /// Adds a configured resource, replacing one for the same model.
    pub fn add_resource(&mut self, resource: Resource) -> Arc<Resource> {
        tracing::info!(resource = %resource.name, model = %resource.model(), "resource added");
        let resource = Arc::new(resource);
        self.resources
            .insert(resource.model().to_string(), resource.clone());
        resource
    }

    /// Adds a resource for `model` with a meta per field.
    pub fn add_default_resource(&mut self, model: &str) -> Result<Arc<Resource>, SchemaError> {
        let mut resource = Resource::new(model, &self.registry)?;
        resource.add_default_metas()?;
        Ok(self.add_resource(resource))
    }

    /// Looks a resource up by model name, label or route segment.
    pub fn get_resource(&self, name: &str) -> Option<Arc<Resource>> {
        if let Some(res) = self.resources.get(name) {
            return Some(res.clone());
        }
        self.resources
            .values()
            .find(|r| r.name == name || r.param() == name)
            .cloned()
    }

    pub fn resources(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.values()
    }

    /// A context on a fresh session, with the configured time format.
    pub fn new_context(&self) -> Context {
        Context::new(self.db.session()).with_time_format(self.config.time_format.clone())
    }

    /// Creates missing tables for every registered model.
    pub async fn auto_migrate(&self) -> Result<(), AppError> {
        let models = self.registry.model_names();
        migration::auto_migrate(self.db.store().as_ref(), &self.registry, &models).await
    }
}
