pub mod config;
pub mod models;
pub mod traits;

pub use config::*;
pub use models::*;
pub use traits::*;
