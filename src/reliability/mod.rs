//! Reliability primitives for outbound calls.

pub mod retry;
