//! Clock Port
//!
//! Single monotonic time source shared by every time comparison in the
//! engine. Nothing inside the engine sleeps; waiting is the caller's job.

/// Unix-seconds clock
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}
