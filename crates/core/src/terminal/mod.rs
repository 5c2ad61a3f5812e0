//! Terminal control: screen sequences, geometry and raw mode

mod raw_mode;
mod screen;
mod traits;

pub use raw_mode::RawModeGuard;
pub use screen::{Screen, ScreenRenderer, SharedScreen};
pub use traits::{DetachedGeometry, FixedGeometry, Geometry, TerminalGeometry};
