pub mod classify;
pub mod context;
pub mod file_api;
pub mod handlers;
pub mod http;
pub mod protocol;
pub mod tree;

pub use classify::{classify, editor_mode, Classification, PublicImages, IMAGE_EXTENSIONS};
pub use context::{AppContext, AppError, UserWorkspace, ValidatedJson, USER_HEADER};
pub use file_api::{
    create_entry, read_file, remove_entry, write_file, EntryKind, FileApiError, ReadOutcome,
};
pub use http::{build_router, run_server};
pub use protocol::PROTOCOL_VERSION;
pub use tree::{build_tree, FileNode, NodeType, TreeOptions};
