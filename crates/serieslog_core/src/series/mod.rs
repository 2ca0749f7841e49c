//! Series writers.
//!
//! - [`RawSeries`]: fixed-size records in linked batch nodes
//! - [`CompressedSeries`]: model-encoded records in retired regions
//! - [`StoredSeries`]: exactly one of the two, chosen at construction
//! - [`Series`]: a shared handle over a [`StoredSeries`]

mod compressed;
mod raw;
mod stored;
mod typed;

pub use compressed::CompressedSeries;
pub use raw::RawSeries;
pub use stored::StoredSeries;
pub use typed::Series;
