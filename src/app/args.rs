use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Tag every image in a folder and move the tagged files into the collection
    Process {
        /// The folder containing images to process
        #[arg(short, long)]
        path: String,

        /// The tagged collection folder
        #[arg(long, default_value = "tagged")]
        tagged: String,

        /// The confidence threshold for general tags
        #[arg(short, long, default_value_t = 0.35)]
        threshold: f32,

        /// The confidence threshold for character tags
        #[arg(short, long, default_value_t = 0.85)]
        character_threshold: f32,

        /// Comma-separated tags to exclude from every result
        #[arg(short, long, default_value = "")]
        exclude: String,

        /// Which pretrained tagger to use
        #[arg(short, long, value_enum, default_value_t = V3Model::SwinV2)]
        model: V3Model,
    },

    /// Write a new tag string into a single image
    Tag {
        /// The image to re-tag
        #[arg(short, long)]
        path: String,

        /// The new comma-separated tag string
        #[arg(short, long)]
        tags: String,
    },

    /// Rebuild the catalog from the tagged collection
    Index {
        /// The tagged collection folder
        #[arg(long, default_value = "tagged")]
        tagged: String,

        /// The catalog database file
        #[arg(long, default_value = "image_database.db")]
        db: String,
    },

    /// Search the tagged collection with a comma-separated tag query
    Search {
        /// Query terms, e.g. "cat, red hat"
        #[arg(short, long)]
        query: String,

        /// The tagged collection folder
        #[arg(long, default_value = "tagged")]
        tagged: String,
    },

    /// List every distinct tag known to the catalog
    AllTags {
        /// The catalog database file
        #[arg(long, default_value = "image_database.db")]
        db: String,
    },
}

/// The available WD v3 tagger models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum V3Model {
    SwinV2,
    Convnext,
    Vit,
    VitLarge,
    Eva02Large,
}

impl Default for V3Model {
    fn default() -> Self {
        V3Model::SwinV2
    }
}

impl V3Model {
    pub fn repo_id(&self) -> String {
        match self {
            V3Model::SwinV2 => "SmilingWolf/wd-swinv2-tagger-v3".to_string(),
            V3Model::Convnext => "SmilingWolf/wd-convnext-tagger-v3".to_string(),
            V3Model::Vit => "SmilingWolf/wd-vit-tagger-v3".to_string(),
            V3Model::VitLarge => "SmilingWolf/wd-vit-large-tagger-v3".to_string(),
            V3Model::Eva02Large => "SmilingWolf/wd-eva02-large-tagger-v3".to_string(),
        }
    }
}
