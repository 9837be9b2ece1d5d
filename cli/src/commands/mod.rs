pub mod build;
pub mod densify;
pub mod export;
pub mod matrix;
pub mod merge;
