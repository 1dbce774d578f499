/// Route functions for reading and streaming the plotted points.
pub mod feed;

pub use feed::*;
