mod types;

pub use types::{MvcError, Result};
