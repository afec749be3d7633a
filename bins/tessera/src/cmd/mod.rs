pub mod config;
pub mod error;
pub mod inspect;
pub mod run;
pub mod value;
