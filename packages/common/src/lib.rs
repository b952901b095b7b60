pub mod config;
pub mod ids;
pub mod storage;

pub use ids::{new_id, now_millis};
