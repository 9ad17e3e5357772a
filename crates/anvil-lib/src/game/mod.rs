pub mod distribution;
pub mod instance;
pub mod launcher;
pub mod pipeline;
pub mod resolver;
pub mod runtime;
