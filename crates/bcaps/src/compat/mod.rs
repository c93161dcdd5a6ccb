//! Compat code; abstraction wrappers ported from patterns pending in ``burn``.

pub mod activation_wrapper;
pub mod normalization_wrapper;
