//! Metadata adapters producing index-aligned label arrays.

mod digit_struct;
#[cfg(feature = "with-hdf5")]
mod mat_file;
mod pickle;
mod uniform;

pub use digit_struct::*;
pub use pickle::*;
pub use uniform::*;

use crate::common::*;

/// The source of uniform metadata.
///
/// Every implementation produces the same four index-aligned arrays, so the
/// batch pipelines never depend on the annotation format.
pub trait MetadataSource
where
    Self: Debug + Send + Sync,
{
    fn load(&self) -> Result<Metadata>;
}

impl MetadataSource for Metadata {
    fn load(&self) -> Result<Metadata> {
        Ok(self.clone())
    }
}

impl<S> MetadataSource for Box<S>
where
    S: MetadataSource + ?Sized,
{
    fn load(&self) -> Result<Metadata> {
        (**self).load()
    }
}

impl<S> MetadataSource for Arc<S>
where
    S: MetadataSource + ?Sized,
{
    fn load(&self) -> Result<Metadata> {
        (**self).load()
    }
}
