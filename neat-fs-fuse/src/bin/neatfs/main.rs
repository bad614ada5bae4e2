mod cli;

use std::io::{self, BufRead};
use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use neat_fs::NeatFileSystem;
use neat_fs_fuse::{ImageFile, Shell};

fn main() -> io::Result<ExitCode> {
    env_logger::init();

    let cli = Cli::parse();
    let image = ImageFile::open(&cli.image, cli.blocks)?;
    let efs = NeatFileSystem::open(Box::new(image)).map_err(io::Error::other)?;
    let mut shell = Shell::new(efs);

    let mut failed = false;
    let mut run = |line: &str| {
        if let Some(reply) = shell.run_line(line) {
            failed |= reply.starts_with("error");
            println!("{reply}");
        }
    };

    if cli.commands.is_empty() {
        for line in io::stdin().lock().lines() {
            run(&line?);
        }
    } else {
        cli.commands.iter().for_each(|line| run(line));
    }

    shell.into_inner().flush()?;

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
