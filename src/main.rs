//! roomsync terminal client.
//!
//! Thin presentation glue over [`ChatView`]: stdin lines become drafts,
//! feed events become printed lines. Commands: `/quit`, `/refresh`,
//! `/delete <id>`.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use dotenvy::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use roomsync::backend::ChatBackend;
use roomsync::backend::postgres::PostgresBackend;
use roomsync::config::AppConfig;
use roomsync::message::{ChangeEvent, FeedEvent, Message};
use roomsync::view::{ChatView, ViewOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (M-LOG-STRUCTURED)
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    // Load .env (if present)
    let _ = dotenv();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("Configuration error: {msg}");
            std::process::exit(1);
        }
    };

    info!(
        name: "chat.config.loaded",
        author = %config.chat.author,
        sort_key = %config.chat.sort_key,
        channel = %config.chat.channel,
        "configuration loaded"
    );

    // One configured backend handle per process lifetime, shared by reference.
    let backend: Arc<dyn ChatBackend> = Arc::new(
        PostgresBackend::connect(
            &config.database.url,
            config.database.max_connections,
            config.chat.channel.clone(),
        )
        .await?,
    );

    let options = ViewOptions {
        author: config.chat.author.clone(),
        sort_key: config.chat.sort_key(),
    };
    let mut view = ChatView::mount(backend, options).await?;

    for message in view.messages() {
        print_message(message);
    }
    println!(
        "-- {} message(s); chatting as {}; /quit to leave --",
        view.messages().len(),
        view.author()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        // Resolve the select before touching the view so neither branch
        // holds a borrow while the other's handler runs.
        let input = tokio::select! {
            event = view.next_event() => Input::Feed(event),
            line = lines.next_line() => Input::Line(line?),
        };
        match input {
            Input::Feed(Some(event)) => apply_and_print(&mut view, event).await,
            Input::Line(Some(line)) => {
                if !handle_line(&mut view, line).await {
                    break;
                }
            }
            Input::Feed(None) | Input::Line(None) => break,
        }
    }

    view.close();
    Ok(())
}

/// One loop turn: either the feed produced an event or the user typed a line.
#[derive(Debug)]
enum Input {
    Feed(Option<FeedEvent>),
    Line(Option<String>),
}

async fn apply_and_print(view: &mut ChatView, event: FeedEvent) {
    match &event {
        FeedEvent::Change(ChangeEvent::Insert { new }) => {
            // Duplicate deliveries are dropped by the store; don't echo them.
            if view.messages().iter().all(|m| m.id != new.id) {
                print_message(new);
            }
        }
        FeedEvent::Change(ChangeEvent::Update { new }) => {
            println!("(edited #{}) {}: {}", new.id, new.author, new.body);
        }
        FeedEvent::Change(ChangeEvent::Delete { old }) => {
            println!("(deleted #{} by {})", old.id, old.author);
        }
        FeedEvent::Resync => println!("-- resyncing --"),
        FeedEvent::Closed => eprintln!("-- live updates stopped; restart to resume --"),
    }
    view.apply(event).await;
}

async fn handle_line(view: &mut ChatView, line: String) -> bool {
    let input = line.trim();
    if input == "/quit" {
        return false;
    }
    if input == "/refresh" {
        view.refresh().await;
        println!("-- {} message(s) --", view.messages().len());
        return true;
    }
    if let Some(rest) = input.strip_prefix("/delete") {
        match rest.trim().parse() {
            Ok(id) => match view.delete(id).await {
                Ok(true) => println!("-- delete sent --"),
                Ok(false) => println!("-- no such message of yours --"),
                Err(_) => eprintln!("-- delete failed: {} --", view.last_error().unwrap_or("?")),
            },
            Err(_) => println!("usage: /delete <id>"),
        }
        return true;
    }

    view.update_draft(line);
    match view.submit().await {
        // Sent (echo arrives via the change stream) or empty draft; nothing to do.
        Ok(_) => {}
        Err(_) => {
            eprintln!(
                "-- send failed, draft kept: {} --",
                view.last_error().unwrap_or("?")
            );
        }
    }
    true
}

fn print_message(message: &Message) {
    println!(
        "[{}] {}: {}",
        message.created_at.format("%H:%M:%S"),
        message.author,
        message.body
    );
}
