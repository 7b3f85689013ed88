#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::new_without_default
)]

pub mod actuator;
pub mod audit;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod liveness;
pub mod poller;
pub mod store;

pub use config::Config;
pub use error::DomofonError;
