mod error;
mod input;
mod phone;
mod seat;

pub use error::*;
pub use input::*;
pub use phone::*;
pub use seat::*;
