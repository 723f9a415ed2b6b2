mod domain;
mod empty_domain;
mod variable_reference;

pub use domain::*;
pub use empty_domain::*;
pub use variable_reference::*;
