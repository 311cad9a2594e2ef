//! Request extractors shared by the saga endpoints.
//!
//! - `bearer` - Resume token from the `Authorization` header

pub mod bearer;

pub use bearer::ResumeBearer;
