//! The three stream facades a `Connection` exposes over its single
//! command queue (§4.5, §4.6).

mod input;
mod output;

pub use input::InputFacade;
pub use output::{OutputFacade, OutputKind};
