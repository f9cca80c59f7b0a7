pub mod boxtree;
pub mod cursor;
pub mod error;
pub mod fourcc;
pub mod frame;
pub mod registry;
pub mod summary;
pub mod synchsafe;
pub mod tag;

pub use boxtree::{BoxNode, BoxTree, NodeId, ParseOptions};
pub use cursor::ByteCursor;
pub use error::{Error, Result};
pub use fourcc::{BoxKey, FourCC};
pub use frame::{Frame, FrameFlags};
pub use registry::{BoxRegistry, PayloadValue, default_registry};
pub use tag::{Tag, TagFlags, TagHeader};
