use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.3.2" for releases, "0.3.2@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "leafwind", bin_name = "leafwind", version = get_version())]
#[command(about = "Convert WhiteWind blog entries into Leaflet publications", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a JSON list of WhiteWind entries into Leaflet records
    #[command(alias = "c")]
    Convert {
        /// Entries JSON file (array or listRecords output), or - for stdin
        input: PathBuf,

        /// Publication name
        #[arg(long)]
        name: String,

        /// Author DID (did:plc:... or did:web:...)
        #[arg(long)]
        did: String,

        /// Publication base path, e.g. blog.example.com
        #[arg(long)]
        base_path: Option<String>,

        /// Publication description
        #[arg(long)]
        description: Option<String>,

        #[arg(long, value_name = "BOOL")]
        show_in_discover: Option<bool>,

        #[arg(long, value_name = "BOOL")]
        show_comments: Option<bool>,

        /// Primary theme color (#rrggbb)
        #[arg(long, value_name = "HEX")]
        primary: Option<String>,

        /// Background theme color (#rrggbb)
        #[arg(long, value_name = "HEX")]
        background: Option<String>,

        /// Page background color (#rrggbb)
        #[arg(long, value_name = "HEX")]
        page_background: Option<String>,

        #[arg(long, value_name = "BOOL")]
        show_page_background: Option<bool>,

        /// JSON list of blob metadata: [{cid, mimeType, size, width, height}]
        #[arg(long, value_name = "FILE")]
        blobs: Option<PathBuf>,

        /// Directory of downloaded blobs used to measure images
        #[arg(long, value_name = "DIR")]
        blob_dir: Option<PathBuf>,

        /// Write records as <collection>/<rkey>.json under this directory
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,

        /// Write a .tar.gz bundle (00.json, 1.json, ...) to this path
        #[arg(long, value_name = "FILE")]
        archive: Option<PathBuf>,

        /// Print the records as JSON on stdout instead of writing files
        #[arg(long, conflicts_with_all = ["out_dir", "archive"])]
        json: bool,
    },

    /// Parse one Markdown document and show the resulting blocks
    #[command(alias = "p")]
    Parse {
        /// Markdown file, or - for stdin
        input: PathBuf,

        /// Author DID used for blob links
        #[arg(long, default_value = "did:plc:unknown")]
        did: String,

        /// JSON list of blob metadata
        #[arg(long, value_name = "FILE")]
        blobs: Option<PathBuf>,

        /// Directory of downloaded blobs used to measure images
        #[arg(long, value_name = "DIR")]
        blob_dir: Option<PathBuf>,

        /// Print blocks as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate record keys, or decode one
    Tid {
        /// How many to generate
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Decode this TID instead of generating
        #[arg(long, value_name = "TID")]
        inspect: Option<String>,
    },

    /// Get or set configuration
    Config {
        /// Configuration key
        key: Option<String>,

        /// Value to set
        value: Option<String>,
    },
}
