//! Complete model families.
pub mod capsnet;
pub mod resnet;
