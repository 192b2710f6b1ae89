pub mod align;

pub mod analysis;

pub mod classifier;

pub mod corpus;

pub mod extract;

pub mod metrics;

pub mod probe;

mod property;
pub use crate::property::{Property, PropertyValue};

mod repr;
pub use crate::repr::Representations;

pub mod wrapper;
