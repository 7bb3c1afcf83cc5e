pub mod config;
pub mod deadline;
pub mod errors;
pub mod http;
pub mod logging;
