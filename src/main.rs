//! mongocursor - query cursor runner
//!
//! Runs a single find query through the cursor engine and prints the
//! documents it yields.
//!
//! # Usage
//!
//! ```bash
//! mongocursor mongodb://localhost:27017 -d shop -C users \
//!     --filter '{"status": "active"}' --sort age:desc --limit 20
//! ```

use std::sync::Arc;

use bson::{Bson, Document};
use tracing::{Level, info};

use mongocursor::cli::{CliInterface, Mode};
use mongocursor::connection::ConnectionManager;
use mongocursor::cursor::Cursor;
use mongocursor::error::Result;

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Connect and open the collection
/// 4. Consume the cursor in the requested mode
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;
    initialize_logging(&cli);

    let config = cli.config();
    let mut manager = ConnectionManager::new(config.connection.clone());
    manager.connect().await?;

    let collection = manager
        .collection(&config.connection.database, &cli.args().collection, &config.cursor)
        .await?;
    let mut cursor = Cursor::new(Arc::new(collection), cli.descriptor()?);

    let outcome = consume(&mut cursor, cli.args().mode).await;
    if let Err(e) = cursor.close().await {
        info!("Closing cursor failed: {}", e);
    }
    manager.disconnect().await?;
    outcome
}

/// Drive the cursor in `mode` and print what it yields
async fn consume(cursor: &mut Cursor, mode: Mode) -> Result<()> {
    match mode {
        Mode::Array => {
            let items = cursor.to_array().await?;
            for doc in &items {
                print_document(doc);
            }
            info!("{} document(s) returned", items.len());
        }
        Mode::Each => {
            cursor
                .each(|item| match item {
                    Some(doc) => print_document(&doc),
                    None => info!("End of cursor"),
                })
                .await?;
        }
        Mode::Next => match cursor.next_object().await? {
            Some(doc) => print_document(&doc),
            None => println!("null"),
        },
        Mode::Explain => match cursor.explain().await? {
            Some(plan) => print_document(&plan),
            None => println!("null"),
        },
        Mode::Count => println!("{}", cursor.count().await?),
    }
    Ok(())
}

fn print_document(doc: &Document) {
    println!("{}", Bson::Document(doc.clone()).into_relaxed_extjson());
}

/// Initialize logging system based on verbosity level
fn initialize_logging(cli: &CliInterface) {
    let level = if cli.args().very_verbose {
        Level::TRACE
    } else if cli.args().verbose {
        Level::DEBUG
    } else {
        cli.config().logging.level.to_tracing_level()
    };

    // Logs go to stderr so stdout stays clean for documents
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if cli.config().logging.timestamps {
        subscriber.init();
    } else {
        subscriber.without_time().init();
    }
}
