pub mod basics;
pub mod dsa;
pub mod elliptic_curves;
pub mod hss;
pub mod pqc;
pub mod rsa;
pub mod sfnt;
pub mod symmetric;

mod shared;
