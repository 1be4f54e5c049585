pub mod macros;
pub mod pairs;
pub mod topology;

pub use pairs::*;
pub use topology::*;
