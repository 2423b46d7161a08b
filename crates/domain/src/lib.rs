pub mod errors;
pub mod todo;
pub mod upload;

pub use errors::*;
pub use todo::*;
pub use upload::*;
