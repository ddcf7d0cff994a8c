use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// HTML files to validate (use '-' or nothing for stdin)
    #[arg(required = false)]
    pub paths: Vec<String>,

    /// Content type of the input; its charset selects the decoding
    #[arg(long, help = "Content type of the input, e.g. \"text/html; charset=iso-8859-1\"")]
    pub content_type: Option<String>,

    /// Directory for snapshots of invalid documents (overrides the config file)
    #[arg(long)]
    pub snapshot_path: Option<PathBuf>,

    /// Ignore diagnostics matching this pattern (repeatable, added to the config file's list)
    #[arg(long = "ignore-error", value_name = "PATTERN")]
    pub ignore_errors: Vec<String>,

    /// Only print the combined report, no summary line
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Where to write the configuration file
    #[arg(long, default_value = ".validate-html.toml")]
    pub output: PathBuf,
}
