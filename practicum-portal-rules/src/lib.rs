//! The eligibility, quota and selection rules of the practicum registration.
//!
//! Everything in here is a pure function over rows loaded from the database so the web layer
//! only has to fetch and render.

pub mod browser;
pub mod eligibility;
pub mod profile;
pub mod quota;
pub mod stats;
