pub mod address;
pub mod deployment;
pub mod handler;
pub mod script;
pub mod storage;
pub mod worker_pool;

// Re-exports for convenience
pub use deployment::ScriptDeploymentListener;
pub use handler::EventHandler;
pub use storage::ScriptUtxoStorage;
pub use worker_pool::{Dispatcher, WorkerPool};
