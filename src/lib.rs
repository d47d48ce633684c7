pub mod error;
pub mod transport;
pub mod field;
pub mod datatype;
pub mod header;
pub mod block;
pub mod blocklist;
pub mod info;
pub mod external;
pub mod options;
pub mod session;
pub mod file;

pub use error::{Result, SdfError};
pub use header::Header;
pub use block::{Block, BlockState};
pub use blocklist::BlockCursor;
pub use datatype::{BlockType, ConstValue, Datatype, Stagger, WireType};
pub use options::{ReaderOptions, UnknownBlockPolicy};
pub use session::{Progress, Session};
pub use transport::{FileTransport, LocalGroup, Transport};
pub use file::SdfFile;
