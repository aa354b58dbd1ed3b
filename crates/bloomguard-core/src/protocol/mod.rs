//! Wire formats spoken to the AMQ service.
//!
//! Only the bloomd text protocol is implemented. Encoders validate every
//! token before producing bytes and decoders are panic-free: an unexpected
//! reply is a `QueryError`, never an index out of bounds.

pub mod bloomd;
