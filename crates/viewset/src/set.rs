//! Compiled template sets.
//!
//! A set is one directory under the view root:
//!
//! ```text
//! views/
//! └── default/            <- set "default"
//!     ├── shared/
//!     │   ├── layout.tmpl <- entry point of every page
//!     │   └── nav.tmpl
//!     ├── home.tmpl       <- page "home.tmpl"
//!     └── about.tmpl      <- page "about.tmpl"
//! ```
//!
//! Shared fragments are compiled once into the set's layout environment under
//! `shared/<file name>`, so they can `{% include "shared/nav.tmpl" %}` each
//! other. Each page gets its own clone of that environment and is compiled as
//! a child of `shared/layout.tmpl`: a page only fills in the blocks the layout
//! declares. Page text outside a `{% block %}` is dropped, so a page with no
//! blocks renders the layout's defaults.
//!
//! ```jinja
//! {# shared/layout.tmpl #}
//! <html><body>{% block content %}{% endblock %}</body></html>
//!
//! {# home.tmpl #}
//! {% block content %}Hello {{ name }}{% endblock %}
//! ```
//!
//! # Failure Classes
//!
//! - A missing or broken layout makes the whole set unusable
//!   ([`ViewError::Layout`]).
//! - A page that cannot be read, or whose name or content is not valid UTF-8,
//!   is skipped; the set is built without it.
//! - A page with a syntax error aborts the compilation ([`ViewError::Syntax`]).

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use minijinja::Environment;
use serde::Serialize;

use crate::config::EngineOptions;
use crate::error::{Result, ViewError};
use crate::functions::FunctionRegistry;

/// Subdirectory of a set holding the shared fragments.
pub const SHARED_DIR: &str = "shared";

/// Extension of shared fragment files.
pub const SHARED_EXTENSION: &str = "tmpl";

/// Name under which the layout entry point is registered.
pub const LAYOUT_TEMPLATE: &str = "shared/layout.tmpl";

/// A compiled set: one shared layout plus every page derived from it.
pub struct TemplateSet {
    name: String,
    layout: Environment<'static>,
    pages: HashMap<String, Environment<'static>>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("name", &self.name)
            .field("pages", &self.page_names())
            .finish()
    }
}

impl TemplateSet {
    fn new(name: &str, layout: Environment<'static>) -> Self {
        Self {
            name: name.to_string(),
            layout,
            pages: HashMap::new(),
        }
    }

    /// Compiles the set stored in `dir` with the given helpers and options.
    ///
    /// The directory listing comes first: a set directory that cannot be
    /// read fails with [`ViewError::Io`] before anything is compiled.
    ///
    /// # Errors
    ///
    /// - [`ViewError::Io`] if `dir` cannot be listed
    /// - [`ViewError::Layout`] if the shared layout is missing or invalid
    /// - [`ViewError::Syntax`] on the first page that fails to compile
    pub fn compile(
        name: &str,
        dir: &Path,
        functions: &FunctionRegistry,
        options: &EngineOptions,
    ) -> Result<Self> {
        let pages = list_pages(dir)?;
        let layout = compile_layout(name, dir, functions, options)?;
        let mut set = TemplateSet::new(name, layout);

        for path in pages {
            let Some(page) = path.file_name().and_then(|n| n.to_str()) else {
                tracing::warn!(set = name, path = %path.display(), "skipping page with non UTF-8 name");
                continue;
            };

            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) => {
                    tracing::warn!(set = name, page, error = %err, "skipping unreadable page");
                    continue;
                }
            };

            set.add_page(page, &source)?;
        }

        tracing::debug!(set = name, pages = set.len(), "compiled template set");
        Ok(set)
    }

    /// Adds a page on top of a clone of the layout.
    ///
    /// The page is compiled as a child of [`LAYOUT_TEMPLATE`]; an existing
    /// page with the same name is replaced.
    pub fn add_page(&mut self, page: &str, source: &str) -> Result<()> {
        let mut env = self.layout.clone();
        let wrapped = format!("{{% extends \"{}\" %}}{}", LAYOUT_TEMPLATE, source);

        env.add_template_owned(page.to_string(), wrapped)
            .map_err(|source| ViewError::Syntax {
                set: self.name.clone(),
                page: page.to_string(),
                source,
            })?;

        self.pages.insert(page.to_string(), env);
        Ok(())
    }

    /// Returns the set name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the set has a page with this file name.
    pub fn contains(&self, page: &str) -> bool {
        self.pages.contains_key(page)
    }

    /// Returns the page names in sorted order.
    pub fn page_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.pages.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Renders a page into `out`.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::NotFound`] if the page does not exist (nothing is
    /// written in that case) and [`ViewError::Render`] if execution fails.
    pub fn render_page<W, T>(&self, out: &mut W, page: &str, data: &T) -> Result<()>
    where
        W: Write + ?Sized,
        T: Serialize + ?Sized,
    {
        let env = self.pages.get(page).ok_or_else(|| ViewError::NotFound {
            set: Some(self.name.clone()),
            page: page.to_string(),
        })?;

        let template = env.get_template(page)?;
        template.render_to_write(data, out)?;
        Ok(())
    }
}

/// Lists the regular files directly inside `dir`, sorted by file name.
fn list_pages(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| ViewError::io(dir, e))?;

    let mut pages = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ViewError::io(dir, e))?;
        let path = entry.path();
        if path.is_dir() {
            continue;
        }
        pages.push(path);
    }

    pages.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(pages)
}

/// Builds the layout environment from `dir/shared/*.tmpl`.
fn compile_layout(
    set: &str,
    dir: &Path,
    functions: &FunctionRegistry,
    options: &EngineOptions,
) -> Result<Environment<'static>> {
    let shared = dir.join(SHARED_DIR);
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&shared.to_string_lossy()),
        SHARED_EXTENSION
    );

    let paths = glob::glob(&pattern)
        .map_err(|e| ViewError::layout(set, format!("invalid pattern {}: {}", pattern, e)))?;

    let mut env = options.environment();
    functions.install(&mut env);

    let mut fragments = 0usize;
    for path in paths {
        let path = path.map_err(|e| ViewError::layout(set, e.to_string()))?;
        if !path.is_file() {
            continue;
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ViewError::layout(set, format!("invalid file name {}", path.display())))?;

        let source = fs::read_to_string(&path).map_err(|e| {
            ViewError::layout(set, format!("cannot read {}: {}", path.display(), e))
        })?;

        env.add_template_owned(format!("{}/{}", SHARED_DIR, file_name), source)
            .map_err(|e| ViewError::layout(set, e.to_string()))?;
        fragments += 1;
    }

    if fragments == 0 {
        return Err(ViewError::layout(
            set,
            format!("no shared templates match {}", pattern),
        ));
    }

    env.get_template(LAYOUT_TEMPLATE).map_err(|_| {
        ViewError::layout(
            set,
            format!("{} not found in {}", LAYOUT_TEMPLATE, shared.display()),
        )
    })?;

    tracing::debug!(set, fragments, "compiled shared layout");
    Ok(env)
}
