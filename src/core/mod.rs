pub mod error;
pub mod protocol;
pub mod queue;
pub mod registry;
pub mod subscriber;
