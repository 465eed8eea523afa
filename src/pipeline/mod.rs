pub mod pipeline;
pub mod shared;
