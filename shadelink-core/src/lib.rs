pub mod controller;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod profile;
pub mod radio;
pub mod state;
pub mod store;

pub use controller::*;
pub use error::*;
pub use profile::*;
pub use radio::*;
pub use state::*;
pub use store::*;
