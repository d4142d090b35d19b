use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Fatal conditions the driver reports to the user. Everything else surfaces as plain I/O context.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("{} does not exist!", .0.display())]
    InputMissing(PathBuf),

    #[error("Unsupported file")]
    UnsupportedFile,

    #[error("Unsupported zip")]
    UnsupportedZip,

    #[error("ROM has built in dual boot support")]
    AlreadyDualBoot,

    #[error("No ramdisk specified")]
    NoRamdisk,

    #[error("ramdisk {name} not found in {}", .archive.display())]
    RamdiskNotFound { name: String, archive: PathBuf },

    #[error("{message} ({tool} exited with {status})")]
    ToolFailed {
        tool: String,
        message: &'static str,
        status: ExitStatus,
    },

    #[error("Failed to run command: \"{command}\"")]
    ToolSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("repacked boot image {field} mismatch: expected {expected}, got {actual}")]
    HeaderMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },
}
