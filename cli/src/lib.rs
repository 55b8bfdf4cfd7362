pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod extract;
pub mod fetch;
pub mod github;
pub mod installer;
pub mod layout;
pub mod logger;
pub mod pipeline;
pub mod progress;
pub mod repo;
pub mod sensor;

pub use error::{ExtractError, FetchError, InstallError};
pub use pipeline::{Pipeline, PipelineReport};
pub use repo::RepoRef;
