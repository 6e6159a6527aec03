//! Samples of the `CA_*` vendor extensions.

mod per_key_authorization;
mod sim_insert;

pub use per_key_authorization::PerKeyAuthorizationAction;
pub use sim_insert::SimInsertAction;
