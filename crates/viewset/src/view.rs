//! The view manager.
//!
//! [`View`] owns everything needed to render pages: the root directory, the
//! helper functions, the compiled sets and the name of the current set.
//!
//! # Lifecycle
//!
//! ```rust,ignore
//! let mut view = View::new("./views");
//! view.add_function("year", || 2012)?;   // before the sets that need it
//! view.mount("/static/", "./public");
//! view.set_default("default")?;          // parses views/default once
//!
//! view.load(&mut response, "home.tmpl", &data)?;
//! ```
//!
//! Sets are compiled lazily by [`View::set_default`] and cached for the life
//! of the view. [`View::parse`] always recompiles and replaces the cached
//! entry.
//!
//! # Concurrency
//!
//! Mutating operations take `&mut self` and rendering takes `&self`. A view
//! shared between request handlers goes behind a lock, with helpers and
//! sets prepared before the first render.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Value};
use serde::Serialize;

use crate::config::{EngineOptions, ViewConfig};
use crate::error::{Result, ViewError};
use crate::functions::FunctionRegistry;
use crate::locale::LocaleResolver;
use crate::resource::ResourceMounts;
use crate::set::TemplateSet;

/// Loads, caches and renders template sets.
pub struct View {
    root: PathBuf,
    sets: HashMap<String, TemplateSet>,
    current: Option<String>,
    functions: FunctionRegistry,
    options: EngineOptions,
    mounts: ResourceMounts,
}

impl View {
    /// Creates a view over `root` with default engine options.
    ///
    /// Nothing is read from disk until a set is parsed.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, EngineOptions::default())
    }

    /// Creates a view over `root` with explicit engine options.
    pub fn with_options(root: impl Into<PathBuf>, options: EngineOptions) -> Self {
        Self {
            root: root.into(),
            sets: HashMap::new(),
            current: None,
            functions: FunctionRegistry::new(),
            options,
            mounts: ResourceMounts::new(),
        }
    }

    /// Builds a view from a configuration.
    ///
    /// Resources are mounted in order, then `default_set` is activated.
    ///
    /// # Errors
    ///
    /// Returns any error from activating the default set.
    pub fn from_config(config: &ViewConfig) -> Result<Self> {
        let mut view = Self::with_options(&config.root, config.engine.clone());
        for mount in &config.resources {
            view.mount(mount.prefix.clone(), &mount.dir);
        }
        if let Some(set) = &config.default_set {
            view.set_default(set)?;
        }
        Ok(view)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Registers a helper function for sets parsed from now on.
    ///
    /// See [`FunctionRegistry::register`].
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Registration`] if the name is not a valid identifier.
    pub fn add_function<F, Rv, Args>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.functions.register(name, f)
    }

    /// Serves `dir` under `prefix` and makes `prefix` the `resource` prefix.
    ///
    /// The directory is not checked. The new prefix is visible to every set,
    /// including those compiled before this call.
    pub fn mount(&mut self, prefix: impl Into<String>, dir: impl Into<PathBuf>) {
        let prefix = prefix.into();
        let dir = dir.into();
        tracing::debug!(prefix = %prefix, dir = %dir.display(), "mounted resources");
        self.functions.set_resource_prefix(prefix.clone());
        self.mounts.mount(prefix, dir);
    }

    /// Returns the prefix the `resource` helper prepends.
    pub fn resource_prefix(&self) -> String {
        self.functions.resource_prefix()
    }

    /// Returns the installed resource mounts, for answering HTTP requests.
    pub fn resources(&self) -> &ResourceMounts {
        &self.mounts
    }

    /// Registers the `lang` and `langset` helpers backed by `resolver`.
    ///
    /// Like any helper, they only reach sets parsed after this call.
    pub fn bind_locale<L>(&mut self, resolver: L)
    where
        L: LocaleResolver + 'static,
    {
        let resolver: Arc<dyn LocaleResolver> = Arc::new(resolver);

        let lang = Arc::clone(&resolver);
        self.functions
            .insert("lang", move |file: String, key: String| -> String {
                lang.load(&file, &key)
            });

        let langset = resolver;
        self.functions.insert(
            "langset",
            move |set: String, file: String, key: String| -> String {
                langset.load_set(&set, &file, &key)
            },
        );
        tracing::debug!("bound locale resolver");
    }

    /// Compiles the set `set` from disk, caches it and makes it current.
    ///
    /// An existing entry for the same name is replaced only when compilation
    /// succeeds; on error the cache and the current set are left unchanged.
    ///
    /// # Errors
    ///
    /// - [`ViewError::Io`] if the set directory cannot be listed, or if
    ///   `set` is absolute or climbs out of the root with `..`
    /// - [`ViewError::Syntax`] if a page fails to compile
    ///
    /// # Panics
    ///
    /// Panics if the shared layout of the set is missing or invalid. Use
    /// [`try_parse`](Self::try_parse) to receive [`ViewError::Layout`] instead.
    pub fn parse(&mut self, set: &str) -> Result<()> {
        match self.try_parse(set) {
            Err(ViewError::Layout { set, message }) => {
                tracing::error!(set = %set, message = %message, "shared layout is unusable");
                panic!("view: invalid shared layout for set '{}': {}", set, message);
            }
            other => other,
        }
    }

    /// Like [`parse`](Self::parse), but returns layout failures as
    /// [`ViewError::Layout`].
    pub fn try_parse(&mut self, set: &str) -> Result<()> {
        let dir = self.set_dir(set)?;
        tracing::debug!(set, dir = %dir.display(), "parsing template set");

        let compiled = TemplateSet::compile(set, &dir, &self.functions, &self.options)?;
        self.sets.insert(set.to_string(), compiled);
        self.current = Some(set.to_string());
        Ok(())
    }

    /// Resolves the directory of `set`, which must stay under the root.
    fn set_dir(&self, set: &str) -> Result<PathBuf> {
        let relative = Path::new(set);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::RootDir | Component::Prefix(_) | Component::ParentDir
            )
        });

        if escapes {
            return Err(ViewError::io(
                relative,
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "set name must be a path inside the view root",
                ),
            ));
        }
        Ok(self.root.join(relative))
    }

    /// Makes `set` current, parsing it first if it is not cached yet.
    ///
    /// A cached set is reused as-is, even if its files changed on disk.
    ///
    /// # Errors
    ///
    /// Returns any error from [`parse`](Self::parse); the current set is
    /// unchanged in that case.
    pub fn set_default(&mut self, set: &str) -> Result<()> {
        if !self.sets.contains_key(set) {
            self.parse(set)?;
        }
        self.current = Some(set.to_string());
        Ok(())
    }

    /// Returns the name of the current set.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Returns the current set.
    pub fn current_set(&self) -> Option<&TemplateSet> {
        self.current.as_deref().and_then(|name| self.sets.get(name))
    }

    /// Returns a cached set by name.
    pub fn set(&self, name: &str) -> Option<&TemplateSet> {
        self.sets.get(name)
    }

    /// Returns the names of all cached sets in sorted order.
    pub fn set_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sets.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Renders `page` of the current set into `out`.
    ///
    /// If the page does not exist, or no set is current, a debug dump of
    /// `data` is written to `out` before [`ViewError::NotFound`] is
    /// returned, so `out` may hold output even on error.
    ///
    /// # Errors
    ///
    /// - [`ViewError::NotFound`] for an unknown page or no current set
    /// - [`ViewError::Render`] if the template fails while executing
    pub fn load<W, T>(&self, out: &mut W, page: &str, data: &T) -> Result<()>
    where
        W: Write + ?Sized,
        T: Serialize + ?Sized,
    {
        match self.current_set() {
            Some(set) if set.contains(page) => set.render_page(out, page, data),
            _ => {
                let _ = write!(out, "{:?}", Value::from_serialize(data));
                Err(ViewError::NotFound {
                    set: self.current.clone(),
                    page: page.to_string(),
                })
            }
        }
    }

    /// Renders `page` of the current set to a string.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load); the debug dump is discarded.
    pub fn render<T>(&self, page: &str, data: &T) -> Result<String>
    where
        T: Serialize + ?Sized,
    {
        let mut out = Vec::new();
        self.load(&mut out, page, data)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}
