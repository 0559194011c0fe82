//! Connection monitor.
//!
//! Connects, prints every notification, fetches the given parameters and
//! their metadata, and lists the server's languages.
//!
//! Run with: cargo run --example monitor -- --host 192.168.4.1 17 42

mod common;

use std::sync::Arc;
use std::time::Duration;

use vpca_client::{Client, Event, HookEvent, HookTarget, Message, Notification, Result};

#[tokio::main]
async fn main() -> Result<()> {
    let args = common::Args::parse();
    common::init_logging(args.debug);

    let client = Client::builder().host(&args.host).tls(args.tls).connect()?;

    let mut notifications = client.notifications();
    tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            match notification {
                Notification::ConnectionClosed(info) => {
                    println!("[closed] code={:?} reason={}", info.code, info.reason);
                }
                other => println!("[notify] {other:?}"),
            }
        }
    });

    client.add_hook(
        HookTarget::from(HookEvent::Error),
        Arc::new(|event: &Event<'_>| {
            if let Event::Error(reason) = event {
                eprintln!("[error] {reason}");
            }
        }),
    )?;

    client.wait_open(Duration::from_secs(10)).await?;
    println!("Connected to {}", args.host);

    client.request_languages(Arc::new(|message: &Message| {
        println!("[languages] {}", message.payload());
    }))?;

    for &id in &args.parameters {
        client.register_listener(
            id,
            Arc::new(move |message: &Message| {
                println!("[value {id}] {}", message.payload());
            }),
        )?;
        client.refresh(id)?;
        client.request_metadata(
            id,
            Arc::new(move |message: &Message| {
                println!("[meta {id}] {}", message.payload());
            }),
        )?;
    }

    common::wait_for_exit(args.no_wait).await;
    client.shutdown();
    Ok(())
}
