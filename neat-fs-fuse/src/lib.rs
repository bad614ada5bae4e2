//! Host side of neat-fs: volume images living in host files, and a shell
//! that drives them.


mod image_file;
mod shell;

pub use self::{
    image_file::ImageFile,
    shell::{errno, Command, Shell, ShellError},
};
