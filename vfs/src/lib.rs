//! Types exchanged between a file system engine and whatever drives it.

mod access;
mod dirent;
mod error;
mod stat;

pub use self::{
    access::Access,
    dirent::{DirEntry, DirEntryType},
    error::{Error, Result},
    stat::Stat,
};
