//! Types that can be recorded into a series.

use crate::encoder::{Encoder, FixedCodec};
use crate::fixed::Fixed;
use crate::model::ModelCodec;
use crate::models::{DeltaModel, IdentityModel, RunLengthModel};

/// A value type with a default raw encoder and a default compression model.
///
/// Series pick their codecs from here unless the caller supplies one.
pub trait Storable: Fixed + Send + Sync + 'static {
    /// The encoder raw-mode series use for this type.
    fn encoder() -> Box<dyn Encoder<Self>> {
        Box::new(FixedCodec::<Self>::new())
    }

    /// The model compressed-mode series use for this type.
    fn model() -> Box<dyn ModelCodec<Self>> {
        Box::new(IdentityModel::<Self>::new())
    }
}

macro_rules! impl_storable_delta {
    ($($ty:ty),*) => {
        $(
            impl Storable for $ty {
                fn model() -> Box<dyn ModelCodec<Self>> {
                    Box::new(DeltaModel::<$ty>::new())
                }
            }
        )*
    };
}

impl_storable_delta!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Storable for bool {
    fn model() -> Box<dyn ModelCodec<Self>> {
        Box::new(RunLengthModel::<bool>::new())
    }
}

impl Storable for f32 {}
impl Storable for f64 {}
impl Storable for char {}
impl Storable for () {}

impl<T: Storable, const N: usize> Storable for [T; N] {}

macro_rules! impl_storable_tuple {
    ($(($($name:ident),+)),+ $(,)?) => {
        $(impl<$($name: Storable),+> Storable for ($($name,)+) {})+
    };
}

impl_storable_tuple! {
    (A),
    (A, B),
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
}
