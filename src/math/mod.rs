//! Mathematical primitives for signvote-fl.
//!
//! - [`sign`] - three-valued sign of scalars and tensors

pub mod sign;

pub use sign::{is_ternary, sign, sign_tensor};
