//! The resource description data model.

pub mod author;
pub mod cite_entry;
pub mod file_reference;
pub mod model;
pub mod resource;
pub mod version;

pub use author::{Author, Maintainer};
pub use cite_entry::CiteEntry;
pub use file_reference::FileReference;
pub use model::Model;
pub use resource::{DecodeMode, Resource};
pub use version::FormatVersion;
