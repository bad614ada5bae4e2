//! A line based front end over the storage operations: one command per
//! line, one reply per command.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use enumflags2::BitFlags;
use neat_fs::{now, NeatFileSystem};
use thiserror::Error;
use vfs::{Access, DirEntryType, Stat};

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    Parse(String),

    #[error(transparent)]
    Fs(#[from] vfs::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShellError {
    pub fn errno(&self) -> i32 {
        match self {
            Self::Parse(_) => libc::EINVAL,
            Self::Fs(err) => errno(err),
            Self::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

/// The errno a host file system reports for `err`.
pub fn errno(err: &vfs::Error) -> i32 {
    use vfs::Error::*;

    match err {
        NotFound => libc::ENOENT,
        Exhausted => libc::ENOSPC,
        PermissionDenied => libc::EACCES,
        InvalidPath | InvalidGeometry(_) => libc::EINVAL,
        AlreadyExists => libc::EEXIST,
        NotADirectory => libc::ENOTDIR,
        IsADirectory => libc::EISDIR,
        DirectoryNotEmpty => libc::ENOTEMPTY,
        NameTooLong => libc::ENAMETOOLONG,
        ConsistencyFault(_) => libc::EIO,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stat(String),
    Ls(String),
    Cat {
        path: String,
        offset: usize,
        len: Option<usize>,
    },
    Write {
        path: String,
        offset: usize,
        data: Vec<u8>,
    },
    Truncate {
        path: String,
        size: u64,
    },
    Touch(String),
    Mknod {
        path: String,
        mode: u32,
    },
    Mkdir {
        path: String,
        mode: u32,
    },
    Rm(String),
    Rmdir(String),
    Ln {
        from: String,
        to: String,
    },
    Mv {
        from: String,
        to: String,
    },
    Chmod {
        mode: u32,
        path: String,
    },
    Utime {
        path: String,
        atime: i64,
        mtime: i64,
    },
    Access {
        path: String,
        mask: BitFlags<Access>,
    },
    /// Copies a host file into the volume
    Put {
        host: PathBuf,
        path: String,
    },
    /// Copies a file of the volume out to the host
    Get {
        path: String,
        host: PathBuf,
    },
    Df,
}

impl FromStr for Command {
    type Err = ShellError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err(ShellError::Parse("empty command".to_owned()));
        };

        let command = match name {
            "stat" => Self::Stat(path(&mut words).ok_or_else(usage("stat PATH"))?),
            "ls" => Self::Ls(path(&mut words).unwrap_or_else(|| "/".to_owned())),
            "cat" => Self::Cat {
                path: path(&mut words).ok_or_else(usage("cat PATH [OFFSET [LEN]]"))?,
                offset: words.next().map(number).transpose()?.unwrap_or(0),
                len: words.next().map(number).transpose()?,
            },
            "write" => {
                let usage = usage("write PATH OFFSET TEXT...");
                let path = path(&mut words).ok_or_else(usage)?;
                let offset = number(words.next().ok_or_else(usage)?)?;
                let data = words.collect::<Vec<_>>().join(" ").into_bytes();
                Self::Write { path, offset, data }
            }
            "truncate" => {
                let usage = usage("truncate PATH SIZE");
                Self::Truncate {
                    path: path(&mut words).ok_or_else(usage)?,
                    size: number(words.next().ok_or_else(usage)?)?,
                }
            }
            "touch" => Self::Touch(path(&mut words).ok_or_else(usage("touch PATH"))?),
            "mknod" => Self::Mknod {
                path: path(&mut words).ok_or_else(usage("mknod PATH [MODE]"))?,
                mode: words.next().map(octal).transpose()?.unwrap_or(0o644),
            },
            "mkdir" => Self::Mkdir {
                path: path(&mut words).ok_or_else(usage("mkdir PATH [MODE]"))?,
                mode: words.next().map(octal).transpose()?.unwrap_or(0o755),
            },
            "rm" => Self::Rm(path(&mut words).ok_or_else(usage("rm PATH"))?),
            "rmdir" => Self::Rmdir(path(&mut words).ok_or_else(usage("rmdir PATH"))?),
            "ln" | "mv" => {
                let usage = usage("ln|mv FROM TO");
                let from = path(&mut words).ok_or_else(usage)?;
                let to = path(&mut words).ok_or_else(usage)?;
                if name == "ln" {
                    Self::Ln { from, to }
                } else {
                    Self::Mv { from, to }
                }
            }
            "chmod" => {
                let usage = usage("chmod MODE PATH");
                Self::Chmod {
                    mode: octal(words.next().ok_or_else(usage)?)?,
                    path: path(&mut words).ok_or_else(usage)?,
                }
            }
            "utime" => {
                let usage = usage("utime PATH ATIME MTIME");
                Self::Utime {
                    path: path(&mut words).ok_or_else(usage)?,
                    atime: number(words.next().ok_or_else(usage)?)?,
                    mtime: number(words.next().ok_or_else(usage)?)?,
                }
            }
            "access" => {
                let usage = usage("access PATH f|[rwx]");
                Self::Access {
                    path: path(&mut words).ok_or_else(usage)?,
                    mask: access_mask(words.next().ok_or_else(usage)?)?,
                }
            }
            "put" => {
                let usage = usage("put HOST_FILE PATH");
                Self::Put {
                    host: words.next().ok_or_else(usage)?.into(),
                    path: path(&mut words).ok_or_else(usage)?,
                }
            }
            "get" => {
                let usage = usage("get PATH HOST_FILE");
                Self::Get {
                    path: path(&mut words).ok_or_else(usage)?,
                    host: words.next().ok_or_else(usage)?.into(),
                }
            }
            "df" => Self::Df,
            unknown => {
                return Err(ShellError::Parse(format!("unknown command {unknown:?}")));
            }
        };

        Ok(command)
    }
}

fn usage(form: &'static str) -> impl Fn() -> ShellError + Copy {
    move || ShellError::Parse(format!("usage: {form}"))
}

fn path<'a>(words: &mut impl Iterator<Item = &'a str>) -> Option<String> {
    words.next().map(str::to_owned)
}

fn number<T: FromStr>(word: &str) -> Result<T, ShellError> {
    word.parse()
        .map_err(|_| ShellError::Parse(format!("not a number: {word:?}")))
}

fn octal(word: &str) -> Result<u32, ShellError> {
    u32::from_str_radix(word, 8)
        .map_err(|_| ShellError::Parse(format!("not an octal mode: {word:?}")))
}

/// `f` tests for existence only, otherwise any of `r`, `w` and `x`.
fn access_mask(word: &str) -> Result<BitFlags<Access>, ShellError> {
    if word == "f" {
        return Ok(BitFlags::empty());
    }

    word.chars()
        .map(|c| match c {
            'r' => Ok(Access::Read),
            'w' => Ok(Access::Write),
            'x' => Ok(Access::Execute),
            _ => Err(ShellError::Parse(format!("bad access mask {word:?}"))),
        })
        .collect()
}

/// Drives a volume with [`Command`]s.
#[derive(Debug)]
pub struct Shell {
    efs: NeatFileSystem,
}

impl Shell {
    pub fn new(efs: NeatFileSystem) -> Self {
        Self { efs }
    }

    pub fn fs(&self) -> &NeatFileSystem {
        &self.efs
    }

    pub fn into_inner(self) -> NeatFileSystem {
        self.efs
    }

    /// Parses and runs one line. Blank lines and `#` comments get no reply.
    pub fn run_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let reply = match line.parse().and_then(|command| self.execute(command)) {
            Ok(payload) if payload.is_empty() => "ok".to_owned(),
            Ok(payload) => format!("ok\n{payload}"),
            Err(err) => {
                log::debug!("{line:?} failed: {err}");
                format!("error: {err} (errno {})", err.errno())
            }
        };
        Some(reply)
    }

    /// Runs `command`, returning what it has to show.
    pub fn execute(&mut self, command: Command) -> Result<String, ShellError> {
        let efs = &mut self.efs;

        let payload = match command {
            Command::Stat(path) => show_stat(&efs.stat(&path)?),
            Command::Ls(path) => {
                let mut listing = String::new();
                for entry in efs.ls(&path)? {
                    let _ = writeln!(
                        listing,
                        "{} {:>4} {}",
                        type_char(entry.ty),
                        entry.inode,
                        entry.name
                    );
                }
                listing.trim_end().to_owned()
            }
            Command::Cat { path, offset, len } => {
                let len = match len {
                    Some(len) => len,
                    None => efs.stat(&path)?.size as usize,
                };
                String::from_utf8_lossy(&efs.read_at(&path, offset, len)?).into_owned()
            }
            Command::Write { path, offset, data } => {
                format!("{} bytes", efs.write_at(&path, offset, &data)?)
            }
            Command::Truncate { path, size } => {
                efs.truncate(&path, size)?;
                String::new()
            }
            Command::Touch(path) => {
                match efs.resolve_path(&path) {
                    Ok(_) => {
                        let now = now();
                        efs.set_times(&path, now, now)?;
                    }
                    Err(vfs::Error::NotFound) => {
                        efs.mknod(&path, 0o644)?;
                    }
                    Err(err) => return Err(err.into()),
                }
                String::new()
            }
            Command::Mknod { path, mode } => format!("inode {}", efs.mknod(&path, mode)?),
            Command::Mkdir { path, mode } => format!("inode {}", efs.mkdir(&path, mode)?),
            Command::Rm(path) => {
                efs.unlink(&path)?;
                String::new()
            }
            Command::Rmdir(path) => {
                efs.rmdir(&path)?;
                String::new()
            }
            Command::Ln { from, to } => {
                efs.link(&from, &to)?;
                String::new()
            }
            Command::Mv { from, to } => {
                efs.rename(&from, &to)?;
                String::new()
            }
            Command::Chmod { mode, path } => {
                efs.chmod(&path, mode)?;
                String::new()
            }
            Command::Utime { path, atime, mtime } => {
                efs.set_times(&path, atime, mtime)?;
                String::new()
            }
            Command::Access { path, mask } => {
                efs.access(&path, mask)?;
                String::new()
            }
            Command::Put { host, path } => {
                let data = fs::read(&host)?;
                match efs.mknod(&path, 0o644) {
                    Ok(_) | Err(vfs::Error::AlreadyExists) => {}
                    Err(err) => return Err(err.into()),
                }
                efs.truncate(&path, 0)?;
                format!("{} bytes", efs.write_at(&path, 0, &data)?)
            }
            Command::Get { path, host } => {
                let size = efs.stat(&path)?.size as usize;
                let data = efs.read_at(&path, 0, size)?;
                fs::write(&host, &data)?;
                format!("{} bytes", data.len())
            }
            Command::Df => {
                let usage = efs.usage();
                format!(
                    "blocks {}/{} ({} bytes each)\ninodes {}/{}",
                    usage.used_blocks,
                    usage.total_blocks,
                    usage.block_size,
                    usage.used_inodes,
                    usage.total_inodes
                )
            }
        };

        Ok(payload)
    }
}

fn show_stat(stat: &Stat) -> String {
    format!(
        "inode {}\nmode {:o}\nsize {}\nblocks {} ({} bytes each)\nuid {}\natime {}\nmtime {}\nctime {}",
        stat.inode,
        stat.mode,
        stat.size,
        stat.blocks,
        stat.block_size,
        stat.uid,
        stat.atime,
        stat.mtime,
        stat.ctime
    )
}

fn type_char(ty: DirEntryType) -> char {
    match ty {
        DirEntryType::Block => 'b',
        DirEntryType::Char => 'c',
        DirEntryType::Directory => 'd',
        DirEntryType::Fifo => 'p',
        DirEntryType::SymLink => 'l',
        DirEntryType::Socket => 's',
        DirEntryType::Regular => '-',
    }
}
