//! faultline-kinds: ready-made error kinds for HTTP-facing services.
//!
//! # Quick Start
//!
//! ```rust
//! use faultline_core::add_at;
//! use faultline_kinds::StandardKinds;
//!
//! let kinds = StandardKinds::new();
//! let mut err = kinds.build("UserError", "").unwrap().finish();
//! let missing = kinds.build("UserError", "Email is required.").unwrap().finish();
//! err = add_at(&err, Some("email"), &missing);
//! assert_eq!(err.to_json()["fields"]["email"], "Email is required.");
//! ```

pub mod standard;

#[cfg(feature = "backtrace")]
pub mod capture;

pub use standard::{declare_bundled, StandardKinds};

#[cfg(feature = "backtrace")]
pub use capture::BacktraceCapture;
