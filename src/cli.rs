use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "sabs-unpack")]
#[command(version)]
#[command(about = "Index and extract FLAC streams from .sabs sound archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  sabs-unpack zm_asylum.all.sabs -d out      extract every entry into out/\n  \
  sabs-unpack -t zm_asylum.all.sabs          show entries as a tree\n  \
  sabs-unpack -p zm_asylum.all.sabs 3 | ffplay -   pipe entry 3 to a player\n  \
  sabs-unpack -l https://example.com/a.sabs  list entries of a remote archive")]
pub struct Cli {
    /// Archive path or HTTP URL
    #[arg(value_name = "ARCHIVE")]
    pub file: String,

    /// Entry indices to extract (default: all)
    #[arg(value_name = "INDICES")]
    pub indices: Vec<usize>,

    /// List entries
    #[arg(short = 'l')]
    pub list: bool,

    /// Show entries as a tree
    #[arg(short = 't')]
    pub tree: bool,

    /// Extract entries to pipe, no messages
    #[arg(short = 'p')]
    pub pipe: bool,

    /// Extract entries into exdir
    #[arg(short = 'd', value_name = "DIR", default_value = ".")]
    pub extract_dir: String,

    /// Never overwrite existing files
    #[arg(short = 'n')]
    pub never_overwrite: bool,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0 || self.pipe
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }

    /// Default log filter when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.is_very_quiet() {
            "error"
        } else if self.is_quiet() {
            "warn"
        } else {
            "info"
        }
    }
}
