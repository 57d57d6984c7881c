//! Node and namespace collectors
//!
//! Each collector turns the raw data of one work unit into an immutable
//! record. Failures are reported per unit as [`CollectionError`] and never
//! abort the surrounding run. Soft problems (missing live metrics) are
//! returned alongside a successful record as warnings.

mod error;
mod namespace;
mod node;


pub use error::{CollectionError, ErrorKind};
pub use namespace::NamespaceCollector;
pub use node::{labels, NodeCollector};

/// A successfully built record plus the soft warnings raised building it
#[derive(Debug, Clone, PartialEq)]
pub struct Collected<T> {
    pub record: T,
    pub warnings: Vec<CollectionError>,
}
