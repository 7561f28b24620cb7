pub mod annotation;
pub mod detection;
pub mod pipeline;
pub mod query;
pub mod shared;
pub mod video;
