//! tempbox - command-line driver for the session core
//!
//! Thin consumer of the service layer: restores or generates a mailbox,
//! prints inbox updates as they arrive, and deletes the session on exit.

use std::sync::Arc;

use anyhow::Result;
use tempbox::config::Settings;
use tempbox::providers::mail::ProviderManager;
use tempbox::services::{SessionEvent, SessionService};
use tempbox::storage::FileSessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let username = std::env::args().nth(1);

    let settings = Settings::load_or_default();
    let manager = Arc::new(ProviderManager::new());
    let store = Arc::new(FileSessionStore::new()?);
    let service = SessionService::new(manager, store, settings);

    let model = match service.restore().await? {
        Some(model) => {
            println!("Restored mailbox: {}", model.email.clone().unwrap_or_default());
            model
        }
        None => {
            let model = service.generate(username.as_deref(), None, None).await?;
            println!("Mailbox: {}", model.email.clone().unwrap_or_default());
            model
        }
    };

    println!(
        "Expires in {}s. Waiting for messages; Ctrl-C deletes the mailbox and exits.",
        model.remaining_secs
    );

    let mut events = service.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Deleting mailbox...");
                service.delete_session().await?;
                break;
            }
            event = events.recv() => match event {
                Ok(SessionEvent::InboxUpdated(count)) => {
                    let model = service.view_model().await;
                    println!("Inbox: {} message(s)", count);
                    for msg in &model.messages {
                        println!(
                            "  [{}] {} - {}",
                            msg.created_at.format("%H:%M:%S"),
                            msg.from.address,
                            msg.subject
                        );
                    }
                }
                Ok(SessionEvent::ExpiryWarning) => println!("One minute left."),
                Ok(SessionEvent::Expired) => {
                    println!("Session expired.");
                    break;
                }
                Ok(SessionEvent::SessionInvalid) => {
                    println!("Session is no longer valid. Generate a new mailbox.");
                    break;
                }
                Ok(SessionEvent::Tick(_)) => {}
                Err(_) => break,
            },
        }
    }

    Ok(())
}
