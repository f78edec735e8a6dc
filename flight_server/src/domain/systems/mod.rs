// Pure flight-model systems: forces, integration and the validity envelope.

pub mod bounds;
pub mod forces;
pub mod integrator;
