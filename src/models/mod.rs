pub mod contract;
pub mod position;
pub mod raw;
pub mod window;

pub use contract::*;
pub use position::*;
pub use raw::*;
pub use window::*;
