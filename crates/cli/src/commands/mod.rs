use clap::Subcommand;
use std::path::PathBuf;

pub mod preload;
pub mod save;

#[derive(Subcommand)]
pub enum Commands {
    /// Save files into a directory, reporting each download as it progresses
    Save {
        /// Directory the files are written to
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Files to save
        #[arg(required = true, value_name = "FILE")]
        files: Vec<PathBuf>,
    },

    /// Load a user's templates, profile and recent documents into the cache
    Preload {
        /// Directory holding templates.json, profiles.json and documents.json
        #[arg(short, long, value_name = "DIR")]
        data: PathBuf,

        /// User whose data is loaded
        #[arg(short, long)]
        user: String,
    },
}
