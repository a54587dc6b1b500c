//! Slidecut Media Sources
//!
//! Collaborators that feed media into the editor:
//! - **Ingest:** Image files become assets
//! - **Overlay generation:** A prompt becomes an overlay image
//! - **Narration:** Recorded or synthesized audio becomes a clip's track
//!
//! Availability of each source is checked up front through [`Capability`].

pub mod capability;
pub mod ingest;
pub mod narration;
pub mod overlay_gen;

pub use capability::{print_capability_report, program_exists, Capability};
pub use ingest::{fill_natural_sizes, image_dimensions, ingest_image_file, ingest_images};
pub use narration::*;
pub use overlay_gen::*;
