pub mod site;

pub use site::{Server, Site};
