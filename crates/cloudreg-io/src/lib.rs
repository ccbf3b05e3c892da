#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// `.pts` point set files.
pub mod pts;

/// `.xf` transform files and their `.txt` viewer mirrors.
pub mod xf;

pub use pts::{read_pts, write_pts, PtsError};
pub use xf::{read_xf, read_xf_or_identity, write_txt, write_xf, XfError};
