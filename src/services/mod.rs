//! # Service Layer
//!
//! Orchestrates repositories and remote procedures into the operations the
//! console and API expose.

pub mod vendor;

pub use vendor::{NewVendor, VendorService, VendorServiceError};
