mod emulate;
mod palette;
mod serve;

pub use emulate::emulate;
pub use palette::palette;
pub use serve::serve;
