pub mod admission;
pub mod codec;
pub mod models;
pub mod ports;
pub mod services;
pub mod settings;
