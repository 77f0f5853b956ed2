//! Example consumer: serves a resource per model from `ADMIN_MODELS` (or a small built-in set).
//!
//! Run from repo root: `cargo run -p example-consumer`

use admin_core::{router, Admin, AdminConfig, AppState, FieldDef, ModelDef};
use tokio::net::TcpListener;

fn builtin_models() -> Vec<ModelDef> {
    vec![
        ModelDef::new("Company")
            .with_id_and_timestamps()
            .field(FieldDef::new("Name", "string").valid("required")),
        ModelDef::new("User")
            .with_id_and_timestamps()
            .field(FieldDef::new("Name", "string").valid("required"))
            .field(FieldDef::new("Age", "uint"))
            .field(FieldDef::new("Role", "string"))
            .field(FieldDef::new("CompanyID", "uint"))
            .field(FieldDef::new("Company", "*Company")),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("admin_core=info")),
        )
        .init();

    let config = AdminConfig::from_env()?;
    let mut admin = Admin::connect(config).await?;
    if admin.registry().model_names().is_empty() {
        for def in builtin_models() {
            admin.register(def)?;
        }
    }
    admin.auto_migrate().await?;
    for model in admin.registry().model_names() {
        admin.add_default_resource(&model)?;
    }

    let app = router(AppState::new(admin));
    let listener = TcpListener::bind("127.0.0.1:3000").await?;
    let port = listener.local_addr()?.port();
    tracing::info!("Admin listening on http://127.0.0.1:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
