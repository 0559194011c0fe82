//! Push stream.
//!
//! Subscribes to pushed values for the given parameters and re-registers
//! every subscription after each reconnect.
//!
//! Run with: cargo run --example push_stream -- --host 192.168.4.1 17

mod common;

use std::sync::Arc;
use std::time::Duration;

use vpca_client::{Client, EngineOptions, Message, Notification, PushRates, Result};

const RATES: PushRates = PushRates::new(100, 1_000);

#[tokio::main]
async fn main() -> Result<()> {
    let args = common::Args::parse();
    common::init_logging(args.debug);

    let options = EngineOptions::new()
        .with_max_reconnect_attempts(20)
        .with_push_retry_budget(5);
    let client = Client::builder()
        .host(&args.host)
        .tls(args.tls)
        .options(options)
        .connect()?;
    client.wait_open(Duration::from_secs(10)).await?;

    for &id in &args.parameters {
        let subscription = client.request_push(
            id,
            RATES,
            Arc::new(move |message: &Message| {
                let value = message.field("ParamVal").cloned().unwrap_or_default();
                println!("[push {id}] {value}");
            }),
        )?;
        println!("Subscribed to {id} ({subscription})");
    }

    client.register_push_synchronizer(Arc::new(|| println!("[sync] push streams refreshed")))?;

    let mut notifications = client.notifications();
    let watcher = client.clone();
    tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            match notification {
                Notification::ConnectionOpened => {
                    let _ = watcher.refresh_push_requests(false);
                }
                Notification::PushFailed { key, .. } => println!("[push failed] {key}"),
                _ => {}
            }
        }
    });

    common::wait_for_exit(args.no_wait).await;
    client.clear_push()?;
    client.shutdown();
    Ok(())
}
