pub mod config;
pub mod data;
pub mod hash;
pub mod heat;
