pub mod builder;
pub mod cache;
pub mod dealer;
pub mod resolver;
pub mod slot;

pub use crate::builder::DealerBuilder;
pub use crate::dealer::{deal, Dealer};
