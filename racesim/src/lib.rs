pub mod core;
pub mod error;
pub mod interfaces;
pub mod post;
pub mod pre;

pub use crate::core::race::{RaceEngine, SimConstants};
pub use crate::error::{RacesimError, Result};
