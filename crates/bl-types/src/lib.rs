pub mod errors;
pub mod loop_state;
pub mod space;

pub use errors::*;
pub use loop_state::*;
pub use space::*;
