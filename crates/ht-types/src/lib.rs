pub mod errors;
pub mod result;
pub mod trial;

pub use errors::*;
pub use result::*;
pub use trial::*;
