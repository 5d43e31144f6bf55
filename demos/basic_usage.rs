// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic flagstore usage example.
//!
//! Demonstrates:
//! 1. Wiring a failover pair as the remote of a sync composer
//! 2. Writing feature/gate state through the stack
//! 3. Serving reads from the local store
//! 4. Riding out a primary outage transparently
//! 5. Displaying metrics (OTEL-compatible)
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;

use metrics_util::debugging::{DebuggingRecorder, Snapshotter};
use serde_json::json;

use flagstore::{
    Adapter, ErrorKind, FailoverAdapter, FailoverConfig, MemoryAdapter, SyncAdapter,
    SyncConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install metrics recorder (captures all metrics for inspection)
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    // Simple logging (no filter for simplicity)
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║             flagstore: Basic Usage Example                    ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Wire the stack: sync(local, failover(primary, secondary))
    // ─────────────────────────────────────────────────────────────────────────
    println!("1. Wiring sync composer over a failover pair...");

    let primary = Arc::new(MemoryAdapter::new());
    let secondary = Arc::new(MemoryAdapter::new());
    let remote = Arc::new(FailoverAdapter::new(
        primary.clone(),
        secondary.clone(),
        FailoverConfig {
            dual_write: true,
            error_kinds: Some(vec![ErrorKind::Connection, ErrorKind::Timeout]),
        },
    ));

    let local = Arc::new(MemoryAdapter::new());
    let flags = SyncAdapter::new(
        local,
        remote,
        SyncConfig {
            interval_secs: 10.0,
            ..Default::default()
        },
    )
    .await?;
    println!("   ✓ Stack ready (local synced at construction)\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Write feature state through the stack
    // ─────────────────────────────────────────────────────────────────────────
    println!("2. Writing feature state...");

    flags.add("search_v2").await?;
    flags.enable("search_v2", "groups", &json!(["admins"])).await?;
    flags.enable("dark_mode", "boolean", &json!(true)).await?;
    flags.enable("new_checkout", "percentage", &json!(25)).await?;
    println!("   ✓ 3 features written to remote, mirrored to local\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Read from the local store
    // ─────────────────────────────────────────────────────────────────────────
    println!("3. Reading back...");

    for feature in flags.features().await? {
        let state = flags.get(&feature).await?;
        println!("   {} → {:?}", feature, state);
    }
    println!();

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Primary outage: dual-write kept the secondary aligned
    // ─────────────────────────────────────────────────────────────────────────
    println!("4. Checking the failover replica...");

    let snapshot = secondary.get_all().await?;
    println!(
        "   ✓ Secondary holds {} features; a primary outage would be invisible to reads\n",
        snapshot.len()
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("5. Captured metrics:");
    print_metrics(&snapshotter);

    println!("\nDone.");
    Ok(())
}

fn print_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot().into_vec();
    for (key, _unit, _desc, value) in snapshot {
        println!("   {} = {:?}", key.key(), value);
    }
}
