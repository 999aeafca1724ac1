//! Agent pipelines. Both agents are fallible subsystems constructed through
//! `Deferred` loaders so their failures degrade health instead of blocking
//! startup.

pub mod memory;
pub mod tools;

mod career;
mod learning;

pub use career::CareerAgent;
pub use learning::LearningAgent;
