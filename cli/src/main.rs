//! bookshelf: a terminal dashboard for the book catalogue backend.
//!
//!   bookshelf register --name Ann --email ann@example.com --password secret
//!   bookshelf books create --title Dune --genre Fiction --description ... \
//!       --cover cover.png --file dune.pdf
//!   bookshelf books list
//!   bookshelf books delete <id>

mod cli;
mod config;
mod output;
mod token_store;

use std::sync::Arc;

use anyhow::Context;
use bookshelf_core::{
    BookId, ClientConfig, Credentials, NewBook, RegistrationRequest, Session, UreqTransport,
};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{BooksCommand, Cli, Commands};
use token_store::FileTokenStore;

type CliSession = Session<UreqTransport, FileTokenStore>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = config::load(cli.config.as_deref(), cli.base_url.as_deref(), |key| {
        std::env::var(key).ok()
    })?;
    let token_path = FileTokenStore::default_path().context("no data directory for the session token")?;
    let session = open_session(&config, FileTokenStore::new(token_path));

    match cli.command {
        Commands::Login { email, password } => cmd_login(&session, email, password).await?,
        Commands::Register {
            name,
            email,
            password,
        } => cmd_register(&session, name, email, password).await?,
        Commands::Logout => {
            session.logout()?;
            println!("Logged out.");
        }
        Commands::Status => cmd_status(&session, &config),
        Commands::Books(command) => match command {
            BooksCommand::List { json } => cmd_list(&session, json).await?,
            BooksCommand::Create {
                title,
                genre,
                description,
                cover,
                file,
            } => {
                let book = NewBook {
                    title,
                    genre,
                    description,
                    cover_image: output::read_attachment(&cover)?,
                    file: output::read_attachment(&file)?,
                };
                cmd_create(&session, &book).await?;
            }
            BooksCommand::Delete { id } => cmd_delete(&session, &BookId::new(id)).await?,
        },
    }

    Ok(())
}

fn open_session(config: &ClientConfig, store: FileTokenStore) -> CliSession {
    tracing::debug!(token_path = %store.path().display(), "opening session");
    Session::new(config, UreqTransport::new(), Arc::new(store))
}

async fn cmd_login(session: &CliSession, email: String, password: String) -> anyhow::Result<()> {
    session.login(&Credentials { email, password }).await?;
    println!("Logged in.");
    Ok(())
}

async fn cmd_register(
    session: &CliSession,
    name: String,
    email: String,
    password: String,
) -> anyhow::Result<()> {
    session
        .register(&RegistrationRequest {
            name,
            email,
            password,
        })
        .await?;
    println!("Registered and logged in.");
    Ok(())
}

fn cmd_status(session: &CliSession, config: &ClientConfig) {
    let state = if session.is_authenticated() {
        "logged in"
    } else {
        "not logged in"
    };
    println!("Backend: {}", config.base_url);
    println!("Session: {state}");
}

async fn cmd_list(session: &CliSession, json: bool) -> anyhow::Result<()> {
    let books = session.books().await?;
    if json {
        println!("{}", output::books_json(&books)?);
    } else {
        println!("{}", output::books_table(&books));
    }
    Ok(())
}

async fn cmd_create(session: &CliSession, book: &NewBook) -> anyhow::Result<()> {
    let created = session.create_book(book).await?;
    println!("Created \"{}\" ({}).", created.title, created.id);
    report_refresh(session, |n| format!("The catalogue now has {n} book(s).")).await;
    Ok(())
}

async fn cmd_delete(session: &CliSession, id: &BookId) -> anyhow::Result<()> {
    session.delete_book(id).await?;
    println!("Deleted {id}.");
    report_refresh(session, |n| format!("{n} book(s) remain.")).await;
    Ok(())
}

// Runs after a successful write; a failed refetch only warns.
async fn report_refresh(session: &CliSession, describe: impl FnOnce(usize) -> String) {
    let refetch = session.books().await.map(|books| books.len());
    match output::refresh_note(refetch, describe) {
        Ok(line) => println!("{line}"),
        Err(warning) => {
            tracing::warn!("catalogue refetch failed after a successful write");
            eprintln!("{warning}");
        }
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
