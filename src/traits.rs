//! Seam between the run loop and the distance matrix provider.
//!
//! The run loop only needs "send these origins and destinations with this
//! credential, give me a response or a failure". Tests script this trait
//! instead of talking to the network.

use crate::bing::MatrixResponse;
use crate::coords::Coordinate;
use crate::error::ProviderError;

/// One batched origin x destination request, minus the credential.
#[derive(Debug, Clone, Copy)]
pub struct MatrixRequest<'a> {
    pub origins: &'a [Coordinate],
    pub destinations: &'a [Coordinate],
    /// Full request timestamp, e.g. `2019-08-05T08:00:00-07:00`.
    pub start_time: &'a str,
}

/// Provides a (partial) distance matrix for one batch.
///
/// Any `Err` is treated as a failure of `key` and triggers rotation.
pub trait DistanceMatrixProvider {
    fn fetch(&self, request: &MatrixRequest<'_>, key: &str) -> Result<MatrixResponse, ProviderError>;
}

impl<P: DistanceMatrixProvider + ?Sized> DistanceMatrixProvider for &P {
    fn fetch(&self, request: &MatrixRequest<'_>, key: &str) -> Result<MatrixResponse, ProviderError> {
        (**self).fetch(request, key)
    }
}
