mod crypto;
mod keys;
mod objects;
mod session_impl;
mod sfnt_ops;

pub use keys::KeyPair;
pub use session_impl::Session;
