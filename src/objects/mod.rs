//! The Luigi Objects.

mod function;
mod list;
mod object;
mod value;

pub use function::*;
pub use list::*;
pub use object::*;
pub use value::*;
