//! Command-line arguments and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Browse and manage the bookshelf catalogue.
#[derive(Parser, Debug)]
#[command(name = "bookshelf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Backend address, overriding the config file and BOOKSHELF_BASE_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Config file to read instead of the default location.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and remember the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account and remember the session token.
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Forget the stored session token.
    Logout,

    /// Show whether a session token is stored.
    Status,

    /// Catalogue operations.
    #[command(subcommand)]
    Books(BooksCommand),
}

#[derive(Subcommand, Debug)]
pub enum BooksCommand {
    /// List every book in the catalogue.
    List {
        /// Print the raw list as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Upload a new book with its cover image.
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        genre: String,
        #[arg(long)]
        description: String,
        /// Cover image file.
        #[arg(long)]
        cover: PathBuf,
        /// Book file (usually a PDF).
        #[arg(long)]
        file: PathBuf,
    },

    /// Delete one of your books by id.
    Delete { id: String },
}
