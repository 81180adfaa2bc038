pub mod files;
pub mod traits;

pub use files::{collect_disk_files, DiskFile, MemoryFile};
pub use traits::{SharedFile, UploadedFile};
