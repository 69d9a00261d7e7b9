pub mod scope;

pub use scope::has_scope;
