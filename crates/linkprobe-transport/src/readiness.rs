//! Blocking readiness wait over several descriptors.
//!
//! The foreground loop services both the serial device and the terminal
//! from one thread; it parks in `poll(2)` until either has input.

use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

/// Wait until at least one descriptor is readable.
///
/// Returns one flag per descriptor, in input order. A hang-up or error
/// condition counts as readable so the following `read` surfaces it.
/// `None` waits forever. An interrupted wait returns all-false.
pub fn wait_readable(fds: &[RawFd], timeout: Option<Duration>) -> io::Result<Vec<bool>> {
    let mut pollfds: Vec<libc::pollfd> = fds
        .iter()
        .map(|&fd| libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    let timeout_ms = match timeout {
        Some(t) => i32::try_from(t.as_millis()).unwrap_or(i32::MAX),
        None => -1,
    };

    // SAFETY: `pollfds` is a valid, exclusively borrowed array of
    // `pollfds.len()` initialized `pollfd` structs for the duration of the call.
    let rc = unsafe {
        libc::poll(
            pollfds.as_mut_ptr(),
            pollfds.len() as libc::nfds_t,
            timeout_ms,
        )
    };

    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(vec![false; fds.len()]);
        }
        return Err(err);
    }

    Ok(pollfds
        .iter()
        .map(|p| p.revents & (libc::POLLIN | libc::POLLHUP | libc::POLLERR) != 0)
        .collect())
}
