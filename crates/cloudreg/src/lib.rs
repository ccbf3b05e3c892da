#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use cloudreg_geometry as geometry;

#[doc(inline)]
pub use cloudreg_icp as icp;

#[doc(inline)]
pub use cloudreg_io as io;

#[doc(inline)]
pub use cloudreg_kdtree as kdtree;
