//! # viewset - Layout-Based Template Sets
//!
//! `viewset` renders server-side pages from directories of templates. Each
//! directory under a root is a *set*: its `shared/` fragments form one layout
//! and every other file in it is a *page* that fills in the layout's blocks.
//! Sets are compiled once, cached by name, and rendered through the
//! *current* set.
//!
//! ## Core Concepts
//!
//! - [`View`]: Owns the root directory, helpers, cached sets and current set
//! - [`TemplateSet`]: One compiled layout plus the pages derived from it
//! - [`FunctionRegistry`]: Helpers callable from templates (`resource`,
//!   `equal`, `plus`, `indent`, and your own)
//! - [`ResourceMounts`]: URL prefixes served from static directories
//! - [`LocaleResolver`]: Lookup behind the `lang` and `langset` helpers
//! - [`ViewConfig`]: Serde configuration for building a view
//!
//! ## Directory Layout
//!
//! ```text
//! views/
//! ├── default/
//! │   ├── shared/
//! │   │   └── layout.tmpl
//! │   └── home.tmpl
//! └── mobile/
//!     ├── shared/
//!     │   └── layout.tmpl
//!     └── home.tmpl
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use viewset::View;
//! use serde::Serialize;
//!
//! # let root = tempfile::tempdir().unwrap();
//! # std::fs::create_dir_all(root.path().join("default/shared")).unwrap();
//! # std::fs::write(
//! #     root.path().join("default/shared/layout.tmpl"),
//! #     "<h1>{% block title %}{% endblock %}</h1>",
//! # ).unwrap();
//! # std::fs::write(
//! #     root.path().join("default/home.tmpl"),
//! #     "{% block title %}{{ name }}{% endblock %}",
//! # ).unwrap();
//! #[derive(Serialize)]
//! struct Home {
//!     name: String,
//! }
//!
//! let mut view = View::new(root.path());
//! view.set_default("default").unwrap();
//!
//! let mut out = Vec::new();
//! view.load(&mut out, "home.tmpl", &Home { name: "Welcome".into() }).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "<h1>Welcome</h1>");
//! ```

pub mod config;
mod error;
pub mod functions;
pub mod locale;
pub mod resource;
pub mod set;
mod view;

pub use config::{EngineOptions, MountConfig, ViewConfig};
pub use error::{Result, ViewError};
pub use functions::FunctionRegistry;
pub use locale::{Catalog, LocaleResolver};
pub use resource::{ResourceMount, ResourceMounts};
pub use set::{TemplateSet, LAYOUT_TEMPLATE};
pub use view::View;
