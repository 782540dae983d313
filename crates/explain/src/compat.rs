//! The `strerror`-style entry points: one shared buffer per thread.
//!
//! Code that wants a message without owning storage calls these. Each call
//! overwrites the thread's previous message. Everything else should use
//! [`explain_errno`](crate::explain_errno) or
//! [`message_errno`](crate::message_errno) with its own storage.

use core::cell::RefCell;

use crate::assemble::Explainable;
use crate::buffer::Buffer;

thread_local! {
    static SHARED: RefCell<Buffer> = RefCell::new(Buffer::new());
}

/// Explain `call` into this thread's shared buffer and return the text.
pub fn explain_errno_string<C: Explainable>(code: C::Code, call: &C) -> String {
    let diagnostic = crate::explain_errno(code, call);
    SHARED.with(|shared| {
        let mut shared = shared.borrow_mut();
        shared.truncate(0);
        diagnostic.write_to(&mut shared);
        shared.as_str().to_owned()
    })
}

/// The last message written on this thread, empty if there was none.
pub fn last_message() -> String {
    SHARED.with(|shared| shared.borrow().as_str().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errno::Errno;
    use crate::syscall::Close;
    use nix::libc;

    #[test]
    fn test_shared_buffer_is_per_thread() {
        let text = explain_errno_string(Errno(libc::EBADF), &Close::new(-1));
        assert!(text.starts_with("close(fildes = -1) failed"));
        assert_eq!(last_message(), text);

        let other = std::thread::spawn(last_message).join().unwrap();
        assert!(other.is_empty());
    }

    #[test]
    fn test_message_is_bounded_by_capacity() {
        let text = explain_errno_string(Errno(libc::EBADF), &Close::new(-1));
        assert!(text.len() <= Buffer::DEFAULT_CAPACITY);
    }
}
