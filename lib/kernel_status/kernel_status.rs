// Copyright 2025 The Pigweed Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License. You may obtain a copy of
// the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the
// License for the specific language governing permissions and limitations under
// the License.

//! # kernel_status
//!
//! Error kinds returned by the scheduling core.  As with every status type in
//! this tree, success is omitted from the `Error` enum so the interface stays
//! idiomatic for Rust, and a `StatusCode` trait is provided to turn a `Result`
//! into the numeric code handed across the syscall and driver boundaries.
//!
//! # Example
//!
//! ```
//! use kernel_status::{Error, Result, StatusCode};
//!
//! fn wakeup(suspended: bool) -> Result<()> {
//!     if suspended {
//!         Ok(())
//!     } else {
//!         Err(Error::InvalidState)
//!     }
//! }
//!
//! assert_eq!(wakeup(true).status_code(), 0);
//! assert_eq!(wakeup(false), Err(Error::InvalidState));
//! ```

#![no_std]

/// Status code for no error.
pub const OK: u32 = 0;

/// Failure kinds of the scheduling core.
///
/// The discriminants are stable: they are what `StatusCode::status_code`
/// reports, so new kinds must be appended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Error {
    /// The tid is out of range or names an empty registry slot.
    Fault = 1,
    /// The thread's current status does not allow the request.
    InvalidState = 2,
    /// The requested status change is not in the legality table.
    InvalidTransition = 3,
    /// The thread has no stack.
    NoMemory = 4,
    /// No free tid in the scanned window.
    Exhausted = 5,
    /// A try-lock found the lock already held.
    Locked = 6,
    /// A transition would have left the kernel without a running thread.
    Fatal = 7,
    /// The registry slot is already occupied.
    AlreadyRegistered = 8,
}

pub type Result<T> = core::result::Result<T, Error>;

/// Convert a Result into an status code.
pub trait StatusCode {
    /// Return the numeric status code, `OK` on success.
    fn status_code(self) -> u32;
}

impl<T> StatusCode for Result<T> {
    fn status_code(self) -> u32 {
        match self {
            Ok(_) => OK,
            Err(e) => e as u32,
        }
    }
}

impl Error {
    pub const fn as_str(self) -> &'static str {
        match self {
            Error::Fault => "Fault",
            Error::InvalidState => "InvalidState",
            Error::InvalidTransition => "InvalidTransition",
            Error::NoMemory => "NoMemory",
            Error::Exhausted => "Exhausted",
            Error::Locked => "Locked",
            Error::Fatal => "Fatal",
            Error::AlreadyRegistered => "AlreadyRegistered",
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        use embedded_io::ErrorKind;
        match self {
            Error::Fault => ErrorKind::NotFound,
            Error::InvalidState => ErrorKind::InvalidInput,
            Error::InvalidTransition => ErrorKind::InvalidInput,
            Error::NoMemory => ErrorKind::OutOfMemory,
            Error::Exhausted => ErrorKind::OutOfMemory,
            Error::Locked => ErrorKind::Interrupted,
            Error::Fatal => ErrorKind::Other,
            Error::AlreadyRegistered => ErrorKind::AlreadyExists,
        }
    }
}
