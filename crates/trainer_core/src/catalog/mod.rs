mod specimens;
mod viewer;

pub use specimens::{InsectInfo, SpecimenCatalog};
pub use viewer::{organ_entries, Carousel, OrganEntry};
