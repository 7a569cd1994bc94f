//! Cache Module
//!
//! Stale-while-revalidate transients over a two-key option layout.

mod bound;
mod clock;
mod facade;
mod transient;


// Re-export public types
pub use bound::{BoundTransient, Callback};
pub use clock::{Clock, ManualClock, SystemClock};
pub use facade::AsyncTransients;
pub use transient::{Lookup, TransientStore};

// == Public Constants ==
/// Namespace prefix applied to every option key
pub const DEFAULT_PREFIX: &str = "_async_transient_";
