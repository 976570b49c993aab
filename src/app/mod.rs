pub mod dispatch;

pub use dispatch::{ReplayScript, dispatch};
