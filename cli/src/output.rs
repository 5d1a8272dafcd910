//! Rendering and file helpers for the commands.

use std::path::Path;

use anyhow::Context;
use bookshelf_core::{ApiError, Attachment, Book};
use comfy_table::{presets::UTF8_FULL, Table};

/// Content type guessed from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "epub" => "application/epub+zip",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Read a file into an upload part.
pub fn read_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(Attachment {
        file_name,
        content_type: content_type_for(path).to_string(),
        bytes,
    })
}

pub fn books_table(books: &[Book]) -> String {
    if books.is_empty() {
        return "No books in the catalogue.".to_string();
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Title", "Genre", "Author", "Created", "ID"]);

    for book in books {
        let author = if book.author.is_empty() { "-" } else { book.author.as_str() };
        let created = book.created_at.get(..10).unwrap_or(&book.created_at);
        table.add_row(vec![
            book.title.as_str(),
            book.genre.as_str(),
            author,
            created,
            book.id.as_str(),
        ]);
    }

    table.to_string()
}

pub fn books_json(books: &[Book]) -> anyhow::Result<String> {
    serde_json::to_string_pretty(books).context("failed to serialize books")
}

/// Summary line after a write: `Ok` for stdout, `Err` for a warning on stderr.
pub fn refresh_note(
    refetch: Result<usize, ApiError>,
    describe: impl FnOnce(usize) -> String,
) -> Result<String, String> {
    refetch
        .map(describe)
        .map_err(|e| format!("Warning: could not refresh the catalogue: {e}"))
}
