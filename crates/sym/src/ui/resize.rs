//! Terminal size cache kept current by SIGWINCH.
//!
//! The handler only touches the atomics below. The session loop calls
//! [`take_dirty`] once per iteration and repaints from scratch when it fires.

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

static COLS: AtomicU16 = AtomicU16::new(0);
static ROWS: AtomicU16 = AtomicU16::new(0);
static DIRTY: AtomicBool = AtomicBool::new(false);

/// Last known `(cols, rows)`, if the size has ever been read.
pub fn size() -> Option<(u16, u16)> {
    let cols = COLS.load(Ordering::Relaxed);
    let rows = ROWS.load(Ordering::Relaxed);
    (cols > 0 && rows > 0).then_some((cols, rows))
}

/// Returns whether a resize happened since the last call, and clears the flag.
pub fn take_dirty() -> bool {
    DIRTY.swap(false, Ordering::AcqRel)
}

/// Stores a new size and flags the next loop iteration to repaint.
pub fn record(cols: u16, rows: u16) {
    store(cols, rows);
    DIRTY.store(true, Ordering::Release);
}

fn store(cols: u16, rows: u16) {
    COLS.store(cols, Ordering::Relaxed);
    ROWS.store(rows, Ordering::Relaxed);
}

#[cfg(unix)]
mod imp {
    use std::io;

    use super::{DIRTY, record, store};
    use std::sync::atomic::Ordering;

    fn query() -> Option<(u16, u16)> {
        // SAFETY: `ws` is a plain C struct; TIOCGWINSZ only writes into it.
        let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
        (rc == 0 && ws.ws_col > 0 && ws.ws_row > 0).then_some((ws.ws_col, ws.ws_row))
    }

    extern "C" fn on_winch(_sig: libc::c_int) {
        match query() {
            Some((cols, rows)) => record(cols, rows),
            None => DIRTY.store(true, Ordering::Release),
        }
    }

    pub(super) fn install() -> io::Result<()> {
        if let Some((cols, rows)) = query() {
            store(cols, rows);
        }
        // SAFETY: the handler is async-signal-safe (ioctl plus atomic stores).
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = on_winch as extern "C" fn(libc::c_int) as libc::sighandler_t;
            // No SA_RESTART: a blocked read returns EINTR so the loop repaints.
            action.sa_flags = 0;
            libc::sigemptyset(&mut action.sa_mask);
            if libc::sigaction(libc::SIGWINCH, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod imp {
    pub(super) fn install() -> std::io::Result<()> {
        Ok(())
    }
}

/// Installs the SIGWINCH handler and primes the cache.
pub fn install() -> std::io::Result<()> {
    imp::install()
}

#[cfg(test)]
mod tests {
    use super::*;

    // The only test in this binary that touches the dirty flag.
    #[test]
    fn record_updates_size_and_flags_one_repaint() {
        record(100, 40);
        assert_eq!(size(), Some((100, 40)));
        assert!(take_dirty());
        assert!(!take_dirty());
    }
}
