mod store;

pub use store::{GalleryEntry, GallerySnapshot, GalleryStore};
