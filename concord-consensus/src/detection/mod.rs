//! Failure and leader detection.

mod eld;
mod epfd;

pub use eld::Eld;
pub use epfd::Epfd;
