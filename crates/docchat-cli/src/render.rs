//! Terminal output for answers, citations and server status.

use std::io::{self, Write};

use chat_core::{Message, Source};
use chat_state::ChatState;
use colored::Colorize;
use docchat_client::{DocumentUploadResponse, HealthResponse};

/// Longest excerpt shown under a citation.
const EXCERPT_CHARS: usize = 160;

/// Prints the streamed answer incrementally as snapshots arrive.
#[derive(Default)]
pub struct AnswerPrinter {
    printed: usize,
}

impl AnswerPrinter {
    /// Print whatever the placeholder gained since the last call.
    pub fn on_snapshot(&mut self, state: &ChatState) -> io::Result<()> {
        match state.last_message() {
            Some(message) if message.is_assistant() => self.print_tail(&message.content),
            _ => Ok(()),
        }
    }

    /// Print the rest of the final answer and end the line.
    pub fn finish(&mut self, answer: &Message) -> io::Result<()> {
        self.print_tail(&answer.content)?;
        println!();
        Ok(())
    }

    /// End a partially printed answer that was rolled back.
    pub fn abandon(&mut self) {
        if self.printed > 0 {
            println!();
        }
    }

    fn print_tail(&mut self, content: &str) -> io::Result<()> {
        if let Some(tail) = content.get(self.printed..) {
            if !tail.is_empty() {
                print!("{}", tail);
                io::stdout().flush()?;
                self.printed = content.len();
            }
        }
        Ok(())
    }
}

pub fn print_sources(sources: &[Source]) {
    if sources.is_empty() {
        return;
    }
    println!("{}", "Sources:".cyan().bold());
    for (index, source) in sources.iter().enumerate() {
        println!(
            "  [{}] {} p.{} ({}% relevant)",
            index + 1,
            source.filename,
            source.page_number,
            source.relevance_percent()
        );
        println!("      {}", excerpt(&source.content).dimmed());
    }
}

fn excerpt(content: &str) -> String {
    let flat = content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", cut.trim_end())
}

pub fn print_health(health: &HealthResponse) {
    println!("{} {}", "Server:".cyan().bold(), health.status);
    if !health.version.is_empty() {
        println!("{} {}", "Version:".cyan().bold(), health.version);
    }
    match health.loaded_document() {
        Some(filename) => {
            println!("{} {}", "Document:".cyan().bold(), filename);
            if let Some(pages) = health.page_count {
                println!("{} {}", "Pages:".cyan().bold(), pages);
            }
            if let Some(chunks) = health.chunk_count {
                println!("{} {}", "Chunks:".cyan().bold(), chunks);
            }
        }
        None => println!("{} {}", "Document:".cyan().bold(), "none loaded".dimmed()),
    }
}

pub fn print_upload(upload: &DocumentUploadResponse) {
    println!(
        "{}",
        format!("Loaded {} ({} chunks)", upload.filename, upload.total_chunks).green()
    );
    if !upload.message.is_empty() {
        println!("{}", upload.message.dimmed());
    }
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "Error:".red().bold(), message.red());
}
