//! Minimal agent loop using the function channel and the mock backend.
//!
//! Run with `cargo run --example function_update`. A real deployment
//! would supply a `CloudBackend` wired to the host transport; the mock
//! stands in here so the example runs anywhere.

use confsync_agent::{
    ConfigStore, FunctionChannel, MemoryStorage, MockCloud, SyncEngine, SystemClock, UpdatePolicy,
};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cloud = MockCloud::new();
    let store = ConfigStore::new(Box::new(MemoryStorage::new()), 512);

    let mut engine = SyncEngine::new(store, SystemClock::new())
        .with_channel(
            Box::new(FunctionChannel::new("setConfig")),
            Box::new(cloud.clone()),
        )
        .with_policy(UpdatePolicy::Once)
        .with_listener(|| tracing::info!("fresh configuration available"));

    if let Err(e) = engine.setup() {
        tracing::error!("setup failed: {e}");
        return;
    }

    // Simulate the backend pushing configuration to the device.
    cloud.invoke_function("setConfig", r#"{"interval": 30, "label": "pump-7"}"#);

    for _ in 0..10 {
        engine.tick();
    }

    tracing::info!(
        interval = engine.get_i64("interval"),
        label = engine.get_str("label"),
        "current configuration"
    );
}
