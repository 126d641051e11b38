pub mod assemble;
pub mod build;
pub mod catalog;
pub mod error;
pub mod exclude;
pub mod extract;
pub mod manifest;
pub mod path_safety;
pub mod verify;
pub mod write;
