//! A tiny persistence playground, independent of the version-control
//! engine: one append-only story file plus a directory of JSON pet
//! records under `.scrapbook/`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the scrapbook data directory.
pub const SCRAPBOOK_DIR: &str = ".scrapbook";

const STORY_FILE: &str = "story";
const PETS_DIR: &str = "pets";

/// Errors from scrapbook persistence.
#[derive(Debug, Error)]
pub enum ScrapbookError {
    /// No record exists for the named pet.
    #[error("no pet named '{0}'")]
    PetNotFound(String),

    /// A pet record failed to (de)serialize.
    #[error("pet record error: {0}")]
    Record(#[from] serde_json::Error),

    /// Generic I/O wrapper.
    #[error("scrapbook I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One persisted pet record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub name: String,
    pub species: String,
    pub age: u32,
}

impl fmt::Display for Pet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} the {}, {} year{} old",
            self.name,
            self.species,
            self.age,
            if self.age == 1 { "" } else { "s" }
        )
    }
}

/// Handle over one scrapbook rooted at a directory.
pub struct Scrapbook {
    story_file: PathBuf,
    pets_dir: PathBuf,
}

impl Scrapbook {
    /// Open the scrapbook under `root`, creating its layout if needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, ScrapbookError> {
        let dir = root.as_ref().join(SCRAPBOOK_DIR);
        let pets_dir = dir.join(PETS_DIR);
        fs::create_dir_all(&pets_dir)?;
        Ok(Self {
            story_file: dir.join(STORY_FILE),
            pets_dir,
        })
    }

    /// Append one line to the story and return the whole story so far.
    pub fn append_story(&self, text: &str) -> Result<String, ScrapbookError> {
        let mut story = self.story()?;
        story.push_str(text);
        story.push('\n');
        fs::write(&self.story_file, &story)?;
        Ok(story)
    }

    /// The full story, empty before the first line.
    pub fn story(&self) -> Result<String, ScrapbookError> {
        if !self.story_file.is_file() {
            return Ok(String::new());
        }
        Ok(fs::read_to_string(&self.story_file)?)
    }

    /// Create and persist a new pet record.
    pub fn add_pet(&self, name: &str, species: &str, age: u32) -> Result<Pet, ScrapbookError> {
        let pet = Pet {
            name: name.to_string(),
            species: species.to_string(),
            age,
        };
        self.save_pet(&pet)?;
        Ok(pet)
    }

    /// Load a pet record by name.
    pub fn load_pet(&self, name: &str) -> Result<Pet, ScrapbookError> {
        let path = self.pets_dir.join(name);
        if !path.is_file() {
            return Err(ScrapbookError::PetNotFound(name.to_string()));
        }
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }

    /// Advance a pet's age by one year and persist the record.
    pub fn birthday(&self, name: &str) -> Result<Pet, ScrapbookError> {
        let mut pet = self.load_pet(name)?;
        pet.age += 1;
        self.save_pet(&pet)?;
        Ok(pet)
    }

    fn save_pet(&self, pet: &Pet) -> Result<(), ScrapbookError> {
        let record = serde_json::to_vec_pretty(pet)?;
        fs::write(self.pets_dir.join(&pet.name), record)?;
        Ok(())
    }
}
