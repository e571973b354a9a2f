pub mod atlas;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod scene;
pub mod seams;
pub mod solver;
pub mod store;
pub mod types;

pub use config::{ApplyMode, PostBakeConfig, RepackConfig, RunConfig, SeamFixConfig, Task};
pub use pipeline::Pipeline;
