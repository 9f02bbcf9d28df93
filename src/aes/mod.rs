mod aes_core;
mod aes_engine;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod aes_ni;
mod aes_tables;

pub use aes_core::*;
pub use aes_engine::*;

#[cfg(test)]
mod tests;
