// Physics backend adapters implementing the domain port.

pub mod integrator;
pub mod native;

pub use integrator::IntegratorBackend;
pub use native::{FdmExec, NativeBackend};

// Fixed settling window after initial conditions are applied. Never exit early: right after
// spawning on the ground every "near ground" check is already true.
pub const SETTLE_STEPS: usize = 30;
