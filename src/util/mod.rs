pub mod obj;

pub use obj::{assign, string_or_null};
