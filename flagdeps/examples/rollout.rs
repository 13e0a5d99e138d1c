//! Staged rollout demo
//!
//! This example walks through a typical release:
//! - Build a small dependency graph (database, auth, api, dashboard)
//! - Try to close a cycle and see the offending path
//! - Try to enable a flag before its dependencies and see the blockers
//! - Pull the database flag during an "incident" and watch the cascade
//! - Print the audit ledger as JSON and the graph as DOT
//!
//! Run with `RUST_LOG=debug` to see every cascaded flag.

use flagdeps::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let log = Arc::new(InMemoryEventLog::new());
    let engine = Engine::open(
        Arc::new(InMemoryFlagStore::new()),
        log.clone(),
        EngineConfig::default().with_max_traversal_steps(10_000),
    )
    .await?;

    let release = Some(Actor::new("release-bot"));

    println!("\n=== Building the graph ===");
    let database = engine.create_flag("new-database", true, release.clone()).await?;
    engine.create_flag("auth-v2", false, release.clone()).await?;
    engine
        .create_flag_with_dependencies("api-v2", true, &["new-database"], release.clone())
        .await?;
    engine
        .create_flag_with_dependencies("dashboard-v2", false, &["api-v2", "auth-v2"], release.clone())
        .await?;

    for dependency in engine.list_dependencies().await? {
        println!("  {}", dependency);
    }

    println!("\n=== Closing a cycle ===");
    let api = engine.get_flag_by_title("api-v2").await?.flag;
    let dashboard = engine.get_flag_by_title("dashboard-v2").await?.flag;
    if let Err(e) = engine.add_dependency(api.id(), dashboard.id(), None).await {
        println!("  rejected: {}", e);
    }

    println!("\n=== Enabling too early ===");
    if let Err(e) = engine.toggle_flag(dashboard.id(), None, None).await {
        println!("  rejected: {}", e);
    }
    let auth = engine.get_flag_by_title("auth-v2").await?.flag;
    engine
        .set_enabled(auth.id(), true, Some("auth ready"), release.clone())
        .await?;
    engine
        .set_enabled(dashboard.id(), true, Some("launch"), release.clone())
        .await?;
    print_statuses(&engine).await?;

    println!("\n=== Incident: database rollback ===");
    engine
        .toggle_flag(database.id(), Some("replication lag"), Some(Actor::new("on-call")))
        .await?;
    print_statuses(&engine).await?;

    let blockers: Vec<String> = engine
        .blockers(dashboard.id())
        .await?
        .iter()
        .map(|f| f.title().to_string())
        .collect();
    println!("  dashboard-v2 is blocked by {:?}", blockers);

    println!("\n=== Audit ledger ===");
    for event in log.events().await? {
        println!("  {}", serde_json::to_string(&event)?);
    }

    println!("\n=== Graph ===");
    println!("{}", engine.to_dot().await);

    Ok(())
}

async fn print_statuses(engine: &Engine) -> Result<(), EngineError> {
    for status in engine.list_flags().await? {
        println!(
            "  {:<14} enabled={:<5} active={:<5} depends on {:?}",
            status.flag.title(),
            status.flag.is_enabled(),
            status.is_active,
            status.dependencies
        );
    }
    Ok(())
}
