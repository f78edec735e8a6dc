// Interface adapters: physics backends, wire protocol and network handling.

pub mod backends;
pub mod http;
pub mod net;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod utils;
