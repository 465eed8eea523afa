pub mod config;
pub mod controller;
pub mod errors;
pub mod helper;
pub mod logging;
pub mod modules;
pub mod pipeline;
pub mod profile;
pub mod utils;
