use std::path::PathBuf;

use clap::Parser;

use crate::error::ArgError;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct CliOptions {
    /// Regular file to scan.
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Path to the INI configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: PathBuf,
}

pub fn parse() -> CliOptions {
    CliOptions::parse()
}

/// Validates that both paths name existing regular files, per §4.8.
pub fn validate(opts: &CliOptions) -> Result<(), ArgError> {
    if !opts.file.is_file() {
        return Err(ArgError::InputNotARegularFile(
            opts.file.display().to_string(),
        ));
    }
    if !opts.config.is_file() {
        return Err(ArgError::ConfigNotARegularFile(
            opts.config.display().to_string(),
        ));
    }
    Ok(())
}
