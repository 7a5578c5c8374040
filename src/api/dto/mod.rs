//! Data Transfer Objects for REST request/response serialization.
//!
//! DTOs use plain `Uuid` and `String` fields so the OpenAPI schema stays
//! independent of the domain newtypes.

pub mod auth_dto;
pub mod room_dto;

pub use auth_dto::*;
pub use room_dto::*;
