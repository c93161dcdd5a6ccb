//! Dropout layers.
pub mod channel_drop;
