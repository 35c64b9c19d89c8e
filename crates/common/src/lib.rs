//! Common types shared by the Solix lite-mode workspace

mod error;
mod mask;
mod secret;

pub use error::{Error, Result};
pub use mask::mask_identity;
pub use secret::Secret;
