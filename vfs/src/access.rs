use enumflags2::bitflags;

/// Access mask as passed to `access(2)`. An empty mask only tests existence.
#[bitflags]
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Execute = 0o1,
    Write = 0o2,
    Read = 0o4,
}
