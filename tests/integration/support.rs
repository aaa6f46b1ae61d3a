use dagfs::tree::Node;
use dagfs::{Caller, FileSystem, FsOptions, ManualClock};
use std::sync::Arc;

/// Filesystem with the default layout and a clock frozen at `start`
pub fn fixed_fs(start: u64) -> (FileSystem, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start));
    let fs = FileSystem::with_options(FsOptions::default(), clock.clone());
    (fs, clock)
}

pub fn root() -> Caller {
    Caller::root()
}

/// Number of stored file nodes holding exactly `content`
pub fn file_nodes_with(fs: &FileSystem, content: &[u8]) -> usize {
    fs.store()
        .iter()
        .filter(|(_, node)| matches!(node, Node::File(f) if f.content == content))
        .count()
}
