pub mod http_client;
pub mod memory;
pub mod models;
pub mod repositories;

pub use http_client::*;
pub use memory::*;
pub use models::*;
pub use repositories::*;
