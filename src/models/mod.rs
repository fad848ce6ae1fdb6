mod advertisement;
mod sighting;

pub use advertisement::{AddressKind, Advertisement};
pub use sighting::Sighting;
