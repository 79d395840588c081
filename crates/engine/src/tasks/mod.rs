#![forbid(unsafe_code)]

pub mod feed;
pub mod profile;
pub mod resources;
