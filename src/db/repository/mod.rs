//! Repository layer — entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`, one sub-module per entity.
//! Row-level authorization does not live here; the engines consult the
//! access guard before calling in.

mod appointment;
mod doctor;
mod patient;
mod prescription;
mod user;

pub use appointment::*;
pub use doctor::*;
pub use patient::*;
pub use prescription::*;
pub use user::*;
