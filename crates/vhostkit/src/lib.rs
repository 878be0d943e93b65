//! vhostkit - virtual host lifecycle for a single machine
//!
//! A virtual host spans four systems that know nothing about each other:
//!
//! - a config file in the web server's sites store
//! - a document root directory
//! - an entry in `/etc/hosts`
//! - the web server's set of enabled sites
//!
//! [`Lifecycle`] creates and destroys hosts across all of them as one
//! operation, and [`Registry`] answers which hosts exist. The systems are
//! reached through the adapter traits in [`backend`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use vhostkit::backend::service::ServiceCommands;
//! use vhostkit::{Adapters, Layout, Lifecycle};
//!
//! let layout = Layout::default();
//! let adapters = Adapters::system(
//!     &layout,
//!     "/etc/hosts".as_ref(),
//!     ServiceCommands::default(),
//!     Duration::from_secs(60),
//! )?;
//! let lifecycle = Lifecycle::new(layout, "template.txt", adapters);
//!
//! let outcome = lifecycle.create("example.test")?;
//! print!("{}", outcome.transcript());
//! # Ok::<(), vhostkit::Error>(())
//! ```

pub mod backend;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod registry;
pub mod step;
pub mod template;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Error, ErrorKind, Result};
pub use lifecycle::{Adapters, DESTROYED_MESSAGE, DisableFailure, Lifecycle, Policy};
pub use registry::Registry;
pub use step::Step;
pub use template::{DEFAULT_TEMPLATE, Template};
pub use types::{CommandOutput, Host, HostName, Layout, Outcome};
