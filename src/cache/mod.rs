//! Branch snapshots and the resume protocol

pub mod entry;
pub mod resume;

pub use entry::{read_cache, BranchSide, CacheEntry};
pub use resume::{find_entry, locate_resume_point, resolve_divergence, resume, ResumePoint};
