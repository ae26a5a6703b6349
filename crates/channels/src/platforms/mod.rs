pub mod matrix;
pub mod stdout;
