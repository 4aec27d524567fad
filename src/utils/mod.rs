pub mod cache;
pub mod data;
pub mod distribution;
pub mod odds;
