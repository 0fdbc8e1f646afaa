mod models;
mod patch;
mod status;
pub mod validation;

pub use models::*;
pub use patch::{RepoPatch, UserPatch};
pub use status::{BuildStatus, ParseStatusError};
