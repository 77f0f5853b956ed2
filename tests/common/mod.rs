#![allow(dead_code)]

use admin_core::{Admin, AdminConfig, FieldDef, ModelDef, Record, Registry, SqliteStore, Store};
use serde_json::Value;
use std::sync::Arc;

pub const MODELS: [&str; 7] = ["Company", "CreditCard", "Address", "Language", "Phone", "Profile", "User"];

pub fn models() -> Vec<ModelDef> {
    vec![
        ModelDef::new("Company")
            .with_id_and_timestamps()
            .field(FieldDef::new("Name", "string")),
        ModelDef::new("CreditCard")
            .with_id_and_timestamps()
            .field(FieldDef::new("Number", "string"))
            .field(FieldDef::new("Issuer", "string")),
        ModelDef::new("Address")
            .with_id_and_timestamps()
            .field(FieldDef::new("UserID", "uint"))
            .field(FieldDef::new("Address1", "string"))
            .field(FieldDef::new("Address2", "string")),
        ModelDef::new("Language")
            .with_id_and_timestamps()
            .field(FieldDef::new("Name", "string")),
        ModelDef::new("Phone")
            .with_id_and_timestamps()
            .field(FieldDef::new("ProfileID", "uint"))
            .field(FieldDef::new("Num", "string")),
        ModelDef::new("Profile")
            .with_id_and_timestamps()
            .field(FieldDef::new("UserID", "uint"))
            .field(FieldDef::new("Name", "string"))
            .field(FieldDef::new("Phone", "Phone")),
        ModelDef::new("User")
            .with_id_and_timestamps()
            .field(FieldDef::new("Name", "string").valid("required"))
            .field(FieldDef::new("Age", "uint"))
            .field(FieldDef::new("Role", "string"))
            .field(FieldDef::new("Active", "bool"))
            .field(FieldDef::new("RegisteredAt", "*time.Time"))
            .field(FieldDef::new("Profile", "Profile"))
            .field(FieldDef::new("CreditCardID", "uint"))
            .field(FieldDef::new("CreditCard", "CreditCard"))
            .field(FieldDef::new("Addresses", "[]Address"))
            .field(FieldDef::new("CompanyID", "uint"))
            .field(FieldDef::new("Company", "*Company"))
            .field(FieldDef::new("Languages", "[]Language").tag("many2many:user_languages")),
    ]
}

/// Admin over a fresh in-memory SQLite database with a default resource per model.
pub async fn admin() -> Admin {
    let store: Arc<dyn Store> = Arc::new(SqliteStore::memory().await.unwrap());
    let registry = Arc::new(Registry::new());
    for def in models() {
        registry.register(def).unwrap();
    }
    let mut admin = Admin::new(store, registry, AdminConfig::default());
    admin.auto_migrate().await.unwrap();
    for model in MODELS {
        admin.add_default_resource(model).unwrap();
    }
    admin
}

pub fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap()
}

/// Saves `value` as a `model` and returns the stored record.
pub async fn create(admin: &Admin, model: &str, value: Value) -> Record {
    let schema = admin.registry().parse(model).unwrap();
    let mut rec = schema.new_record();
    rec.extend(record(value));
    admin.db().save(model, &mut rec).await.unwrap();
    rec
}

pub fn id(record: &Record) -> u64 {
    record["ID"].as_u64().unwrap()
}
