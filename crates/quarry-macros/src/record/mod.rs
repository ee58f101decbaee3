//! Implementation of the `#[derive(Record)]` and `#[derive(RecordEnum)]`
//! macros.
//!
//! This module generates schema descriptors and field readers from struct
//! annotations.

mod attrs;
mod derive;

pub use derive::{record_derive_impl, record_enum_derive_impl};
