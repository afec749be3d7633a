pub mod codec;
pub mod config;

pub use tessera_api_derive::ConfigParams;
pub mod error;
pub mod fs;
pub mod schema;
pub mod value;
