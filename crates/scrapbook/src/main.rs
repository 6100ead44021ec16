//! Scrapbook command-line tool.

use anyhow::Result;
use clap::{Parser, Subcommand};

use trove_scrapbook::Scrapbook;

/// A tiny story-and-pets scrapbook.
#[derive(Parser, Debug)]
#[command(name = "scrapbook", version, about = "Keep a story and some pets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a line to the story and print the story so far.
    Story { text: String },

    /// Create a new pet record.
    Pet {
        name: String,
        species: String,
        age: u32,
    },

    /// Celebrate a pet's birthday.
    Birthday { name: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let book = Scrapbook::open(std::env::current_dir()?)?;

    match cli.command {
        Commands::Story { text } => {
            print!("{}", book.append_story(&text)?);
        }
        Commands::Pet { name, species, age } => {
            let pet = book.add_pet(&name, &species, age)?;
            println!("{pet}");
        }
        Commands::Birthday { name } => {
            let pet = book.birthday(&name)?;
            println!("Happy birthday! {pet}");
        }
    }
    Ok(())
}
