pub mod read;
pub mod tree;
