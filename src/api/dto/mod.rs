//! Data Transfer Objects for REST request/response serialization.

pub mod control_dto;
pub mod system_dto;

pub use control_dto::*;
pub use system_dto::*;
