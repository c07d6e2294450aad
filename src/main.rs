use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use memtar::tar::{BLOCK_DEVICE, CHAR_DEVICE, DIRECTORY, FIFO, HARD_LINK, SYMLINK};
use memtar::{EntryMetadata, ListPolicy, extract, list_entries_with};

/// Inspect tar archives without unpacking them
#[derive(Debug, Parser)]
#[command(name = "memtar", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List files in tar archive
    List {
        #[arg(value_name = "TARFILE")]
        tarfile: PathBuf,
        /// Show type, permissions and modification time
        #[arg(short, long)]
        long: bool,
        /// Fail on the first corrupt header instead of listing what precedes it
        #[arg(long)]
        strict: bool,
    },
    /// Write one file from the archive to stdout
    Cat {
        #[arg(value_name = "TARFILE")]
        tarfile: PathBuf,
        #[arg(value_name = "NAME")]
        name: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    match Cli::parse().command {
        Command::List { tarfile, long, strict } => {
            let tar_data = read_archive(&tarfile)?;
            let policy = if strict { ListPolicy::Strict } else { ListPolicy::Lenient };
            let entries = list_entries_with(&tar_data, policy)
                .with_context(|| format!("listing {}", tarfile.display()))?;

            println!("Files in {}:", tarfile.display());
            for entry in &entries {
                if long {
                    println!("{}", long_line(entry));
                } else {
                    println!("{:>10}  {}", entry.size, entry.name);
                }
            }
            println!("\nTotal: {} file(s)", entries.len());
        }
        Command::Cat { tarfile, name } => {
            let tar_data = read_archive(&tarfile)?;
            let Some(data) = extract(&tar_data, &name)
                .with_context(|| format!("reading {} from {}", name, tarfile.display()))?
            else {
                bail!("{} not found in {}", name, tarfile.display());
            };
            std::io::stdout().lock().write_all(&data)?;
        }
    }
    Ok(())
}

fn read_archive(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn long_line(entry: &EntryMetadata) -> String {
    let modified = entry
        .modified()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".repeat(16));
    format!(
        "{}{} {:>10} {} {}",
        type_char(entry.entry_type),
        mode_string(entry.mode),
        entry.size,
        modified,
        entry.name
    )
}

fn type_char(typeflag: u8) -> char {
    match typeflag {
        DIRECTORY => 'd',
        SYMLINK => 'l',
        HARD_LINK => 'h',
        CHAR_DEVICE => 'c',
        BLOCK_DEVICE => 'b',
        FIFO => 'p',
        _ => '-',
    }
}

/// rwx triplets for owner, group and other
fn mode_string(mode: u32) -> String {
    (0..9)
        .rev()
        .map(|bit| {
            if mode & (1 << bit) == 0 {
                '-'
            } else {
                ['x', 'w', 'r'][bit % 3]
            }
        })
        .collect()
}
