//! Data Transfer Objects for REST request/response serialization.
//!
//! Wire field names are camelCase, matching the frames browsers already
//! receive over the update stream.

pub mod account_dto;
pub mod device_dto;

pub use account_dto::*;
pub use device_dto::*;
