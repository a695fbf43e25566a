pub mod download;
pub mod merge;
