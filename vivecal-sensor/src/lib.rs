pub mod scripted;
mod source;
pub use source::*;
