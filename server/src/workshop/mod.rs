//! Business rules of the workshop that don't depend on the database.

pub mod address;
pub mod board;
pub mod folio;
pub mod progress;
pub mod vacation;
