//! Probes of ambient process and system state.
//!
//! Every probe is best effort: it returns `None` (or an "unknown" variant)
//! when the information is not available, and never changes `errno`.

pub mod cwd;
pub mod eio;
pub mod fd;
pub mod holders;
pub mod mount;
pub mod pointer;

pub use cwd::{current_dir, CwdLookup};
pub use fd::{fd_info, FdInfo};
pub use holders::holders;
pub use mount::{mount_point, mount_point_fd, Mount};
pub use pointer::is_efault;
