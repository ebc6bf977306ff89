#[cfg(feature = "echo")]
pub mod echo;
