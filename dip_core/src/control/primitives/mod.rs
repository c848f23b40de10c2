// dip_core/src/control/primitives/mod.rs

//! Building blocks shared by every sliding-mode controller.

pub mod adaptation;
pub mod equivalent;
pub mod surface;
pub mod switching;

pub use adaptation::{AdaptationLaw, AdaptationRegime};
pub use equivalent::EquivalentControl;
pub use surface::{SlidingSurface, SurfaceGains};
pub use switching::SwitchingFunction;
