pub mod archive;
pub mod bootimg;
pub mod classifier;
pub mod compress;
pub mod config;
pub mod cpio;
pub mod error;
pub mod header;
pub mod pipeline;
pub mod ramdisk;
pub mod tools;
pub mod utils;
pub mod workspace;

pub use classifier::{Classification, FileInfo, classify};
pub use config::Config;
pub use error::PatchError;
pub use pipeline::patch_file;
