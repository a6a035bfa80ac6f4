/*!
 * Core Types
 * Common types used across the kernel
 */

/// Process ID type
pub type Pid = u32;

/// Scheduling priority (1 is the most urgent, see `limits`)
pub type Priority = u8;

/// Simulated clock value in microseconds since boot
pub type Timestamp = u64;

/// Exit status handed from a quitting child to its parent
pub type ExitCode = i32;

/// Process name, inline for the short names the table allows
pub type ProcName = smartstring::alias::String;

/// How a blocking primitive was resumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumed {
    /// Woken by the event it waited for
    Normal,
    /// Woken while the caller itself has been zapped
    Zapped,
}

impl Resumed {
    #[inline]
    #[must_use]
    pub const fn from_zapped(zapped: bool) -> Self {
        if zapped {
            Resumed::Zapped
        } else {
            Resumed::Normal
        }
    }

    /// Legacy return code: 0 for a normal wake, -1 when zapped
    #[inline]
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Resumed::Normal => 0,
            Resumed::Zapped => -1,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_zapped(self) -> bool {
        matches!(self, Resumed::Zapped)
    }
}

/// Result of a successful join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Joined {
    /// Child that was collected
    pub pid: Pid,
    /// Exit status the child quit with
    pub status: ExitCode,
    /// Whether the joining process had been zapped
    pub resumed: Resumed,
}

impl Joined {
    /// Legacy return code: the child's pid, or -1 if the caller was zapped
    #[inline]
    #[must_use]
    pub fn code(&self) -> i64 {
        match self.resumed {
            Resumed::Normal => i64::from(self.pid),
            Resumed::Zapped => -1,
        }
    }
}
