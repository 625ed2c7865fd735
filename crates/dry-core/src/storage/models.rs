/// One indexed file. Created once, never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub hash: String,
    pub size: u64,
}

/// One confirmed member of a duplicate group, keyed by the shared hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRecord {
    pub group_key: String,
    pub path: String,
    pub size: u64,
}
