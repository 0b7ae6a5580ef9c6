pub mod projection;
pub mod summary;
