pub mod index;
pub mod records;
pub mod brep;
pub mod build;
pub mod navigate;
pub mod vertices;
pub mod cache;
pub mod primitives;
pub mod dump;
