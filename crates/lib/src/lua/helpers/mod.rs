//! Helper tables exposed to descriptor scripts.

pub mod path;
