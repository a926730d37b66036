//! Wayfarer Restoration
//!
//! A stack serializes to an ordered list of elements, each either a
//! location string (rebuilt through the route parser) or a converter
//! record carrying out-of-band state. An indexed stack serializes to its
//! active index. A whole coordinator serializes to a `NavigationSnapshot`.

mod codec;
mod converter;
mod error;
mod format;
mod snapshot;

pub use codec::RouteCodec;
pub use converter::{ConverterRegistry, RouteConverter, SerdeConverter};
pub use error::RestoreError;
pub use format::{RouteRecord, SerializedRoute, SerializedStack};
pub use snapshot::NavigationSnapshot;

pub type Result<T> = std::result::Result<T, RestoreError>;
