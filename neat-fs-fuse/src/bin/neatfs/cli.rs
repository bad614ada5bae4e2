use clap::Parser;
use neat_fs::{DEFAULT_BLOCK_COUNT, MAX_BLOCK_COUNT};
use std::path::PathBuf;

/// Inspect and edit a neat-fs volume image
#[derive(Parser)]
#[command(version)]
pub struct Cli {
    /// Volume size in blocks when the image is created, a multiple of 8
    #[arg(long, short, default_value_t = DEFAULT_BLOCK_COUNT, value_parser = block_count)]
    pub blocks: u32,

    /// Command to run instead of reading stdin, may be repeated
    #[arg(long = "command", short = 'c')]
    pub commands: Vec<String>,

    /// Image file, created when missing
    pub image: PathBuf,
}

fn block_count(arg: &str) -> Result<u32, String> {
    let count: u32 = arg.parse().map_err(|_| format!("{arg:?} is not a number"))?;
    if count % 8 != 0 || !(8..=MAX_BLOCK_COUNT).contains(&count) {
        return Err(format!("expected a multiple of 8 in 8..={MAX_BLOCK_COUNT}"));
    }
    Ok(count)
}
