//! Stock compression models.
//!
//! | Model | Suits | Model state |
//! |-------|-------|-------------|
//! | [`IdentityModel`] | anything fixed-size | record count |
//! | [`DeltaModel`] | integers that move slowly | previous value, count |
//! | [`RunLengthModel`] | flags and enums that rarely change | open run |

mod delta;
mod identity;
mod run_length;

pub use delta::{DeltaModel, DeltaValue};
pub use identity::IdentityModel;
pub use run_length::RunLengthModel;
