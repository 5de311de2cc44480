//! Helper functions exposed to templates.
//!
//! A [`FunctionRegistry`] holds every helper a template set is compiled with.
//! Sets copy the registry's contents when they are compiled, so registering
//! a helper later only affects sets parsed afterwards.
//!
//! # Built-in Helpers
//!
//! | Helper | Signature | Result |
//! |--------|-----------|--------|
//! | `resource` | `resource(uri)` | resource prefix followed by `uri` |
//! | `equal` | `equal(a, b)` | `true` when both values are equal |
//! | `plus` | `plus(a, b)` | integer sum, an error on overflow |
//! | `indent` | `indent(s, n)` | `s` repeated `n` times, empty for `n <= 0` |
//!
//! `resource` reads the prefix when the template runs, not when it is
//! compiled. Mounting a new prefix changes the output of sets that are
//! already cached. The prefix and the URI are concatenated as-is:
//!
//! ```rust
//! use viewset::FunctionRegistry;
//!
//! let registry = FunctionRegistry::new();
//! registry.set_resource_prefix("/static/");
//!
//! let mut env = minijinja::Environment::new();
//! registry.install(&mut env);
//! let out = env.render_str(r#"{{ resource("/img/x.png") }}"#, ()).unwrap();
//! assert_eq!(out, "/static//img/x.png");
//! ```
//!
//! # Function Shape
//!
//! Any closure or function the engine can call is accepted: its arguments
//! must be convertible from template values and it returns either a value or
//! a `Result<_, minijinja::Error>`. The compiler enforces this through
//! [`minijinja::functions::Function`], so the only runtime check left is on
//! the helper's name.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult, Value};
use minijinja::{Environment, Error, ErrorKind};
use parking_lot::RwLock;

use crate::error::{Result, ViewError};

/// Named helper functions injected into every template set.
pub struct FunctionRegistry {
    functions: BTreeMap<String, Value>,
    resource_prefix: Arc<RwLock<String>>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Creates a registry holding the built-in helpers and an empty resource prefix.
    pub fn new() -> Self {
        let mut registry = Self {
            functions: BTreeMap::new(),
            resource_prefix: Arc::new(RwLock::new(String::new())),
        };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        let prefix = Arc::clone(&self.resource_prefix);
        self.insert("resource", move |uri: String| -> String {
            let prefix = prefix.read();
            format!("{}{}", prefix, uri)
        });

        self.insert("equal", |a: Value, b: Value| -> bool { a == b });

        self.insert("plus", |a: i64, b: i64| -> std::result::Result<i64, Error> {
            a.checked_add(b)
                .ok_or_else(|| invalid_operation(format!("plus({}, {}) overflows", a, b)))
        });

        self.insert("indent", |s: String, n: i64| -> std::result::Result<String, Error> {
            if n <= 0 {
                return Ok(String::new());
            }
            let count = usize::try_from(n)
                .ok()
                .filter(|count| s.len().checked_mul(*count).is_some())
                .ok_or_else(|| {
                    invalid_operation(format!("indent({:?}, {}) is too large", s, n))
                })?;
            Ok(s.repeat(count))
        });
    }

    pub(crate) fn insert<F, Rv, Args>(&mut self, name: &str, f: F)
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        self.functions
            .insert(name.to_string(), Value::from_function(f));
    }

    /// Registers a helper function, replacing any helper with the same name.
    ///
    /// Built-ins can be replaced too. Sets that are already compiled keep
    /// the helper they were compiled with.
    ///
    /// # Errors
    ///
    /// Returns [`ViewError::Registration`] if `name` is not a valid template
    /// identifier (ASCII letters, digits and `_`, not starting with a digit).
    ///
    /// # Example
    ///
    /// ```rust
    /// use viewset::FunctionRegistry;
    ///
    /// let mut registry = FunctionRegistry::new();
    /// registry.register("shout", |s: String| s.to_uppercase()).unwrap();
    /// assert!(registry.register("not-valid", |s: String| s).is_err());
    /// ```
    pub fn register<F, Rv, Args>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        validate_name(name)?;
        self.insert(name, f);
        tracing::debug!(helper = name, "registered helper function");
        Ok(())
    }

    /// Returns true if a helper with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Returns the registered helper names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Returns the prefix the `resource` helper currently prepends.
    pub fn resource_prefix(&self) -> String {
        self.resource_prefix.read().clone()
    }

    /// Replaces the prefix used by the `resource` helper.
    ///
    /// Takes `&self`: compiled templates share the prefix and observe the
    /// change on their next render.
    pub fn set_resource_prefix(&self, prefix: impl Into<String>) {
        *self.resource_prefix.write() = prefix.into();
    }

    /// Copies every registered helper into `env` as a callable global.
    pub fn install(&self, env: &mut Environment<'static>) {
        for (name, function) in &self.functions {
            env.add_global(name.clone(), function.clone());
        }
    }
}

fn invalid_operation(message: String) -> Error {
    Error::new(ErrorKind::InvalidOperation, message)
}

fn validate_name(name: &str) -> Result<()> {
    let reason = match name.chars().next() {
        None => Some("name is empty"),
        Some(first) if first.is_ascii_digit() => Some("name starts with a digit"),
        Some(_) if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') => {
            Some("name must contain only ASCII letters, digits and '_'")
        }
        _ => None,
    };

    match reason {
        Some(reason) => Err(ViewError::Registration {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn render(registry: &FunctionRegistry, source: &str) -> String {
        let mut env = Environment::new();
        registry.install(&mut env);
        env.render_str(source, ()).unwrap()
    }

    // =========================================================================
    // Built-in helpers
    // =========================================================================

    #[test]
    fn test_builtins_registered() {
        let registry = FunctionRegistry::new();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["equal", "indent", "plus", "resource"]);
        assert_eq!(registry.len(), 4);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_indent_repeats() {
        let registry = FunctionRegistry::new();
        assert_eq!(render(&registry, r#"{{ indent("ab", 3) }}"#), "ababab");
        assert_eq!(render(&registry, r#"{{ indent("ab", 0) }}"#), "");
        assert_eq!(render(&registry, r#"{{ indent("ab", -2) }}"#), "");
    }

    #[test]
    fn test_plus() {
        let registry = FunctionRegistry::new();
        assert_eq!(render(&registry, "{{ plus(2, 40) }}"), "42");
        assert_eq!(render(&registry, "{{ plus(-5, 3) }}"), "-2");
    }

    #[test]
    fn test_plus_overflow_is_error() {
        let registry = FunctionRegistry::new();
        let mut env = Environment::new();
        registry.install(&mut env);

        let err = env
            .render_str("{{ plus(9223372036854775807, 1) }}", ())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
        assert!(env
            .render_str("{{ plus(n, -1) }}", minijinja::context! { n => i64::MIN })
            .is_err());
    }

    #[test]
    fn test_indent_too_large_is_error() {
        let registry = FunctionRegistry::new();
        let mut env = Environment::new();
        registry.install(&mut env);

        let err = env
            .render_str(r#"{{ indent("ab", n) }}"#, minijinja::context! { n => i64::MAX })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[test]
    fn test_equal() {
        let registry = FunctionRegistry::new();
        assert_eq!(render(&registry, "{{ equal(1, 1) }}"), "true");
        assert_eq!(render(&registry, r#"{{ equal("a", "b") }}"#), "false");
        assert_eq!(render(&registry, r#"{{ equal("a", "a") }}"#), "true");
    }

    #[test]
    fn test_resource_concatenates_without_joining() {
        let registry = FunctionRegistry::new();
        assert_eq!(render(&registry, r#"{{ resource("/img/x.png") }}"#), "/img/x.png");

        registry.set_resource_prefix("/static/");
        assert_eq!(
            render(&registry, r#"{{ resource("/img/x.png") }}"#),
            "/static//img/x.png"
        );
    }

    #[test]
    fn test_resource_prefix_read_at_call_time() {
        let registry = FunctionRegistry::new();
        let mut env = Environment::new();
        registry.install(&mut env);
        env.add_template("page", r#"{{ resource("app.css") }}"#)
            .unwrap();

        registry.set_resource_prefix("/a/");
        assert_eq!(env.get_template("page").unwrap().render(()).unwrap(), "/a/app.css");

        registry.set_resource_prefix("/b/");
        assert_eq!(env.get_template("page").unwrap().render(()).unwrap(), "/b/app.css");
        assert_eq!(registry.resource_prefix(), "/b/");
    }

    // =========================================================================
    // Registration
    // =========================================================================

    #[test]
    fn test_register_custom_helper() {
        let mut registry = FunctionRegistry::new();
        registry
            .register("shout", |s: String| s.to_uppercase())
            .unwrap();
        assert!(registry.contains("shout"));
        assert_eq!(render(&registry, r#"{{ shout("hi") }}"#), "HI");
    }

    #[test]
    fn test_register_fallible_helper() {
        let mut registry = FunctionRegistry::new();
        registry
            .register("half", |n: i64| -> std::result::Result<i64, minijinja::Error> {
                if n % 2 == 0 {
                    Ok(n / 2)
                } else {
                    Err(minijinja::Error::new(
                        minijinja::ErrorKind::InvalidOperation,
                        "odd number",
                    ))
                }
            })
            .unwrap();

        assert_eq!(render(&registry, "{{ half(8) }}"), "4");

        let mut env = Environment::new();
        registry.install(&mut env);
        assert!(env.render_str("{{ half(3) }}", ()).is_err());
    }

    #[test]
    fn test_register_overwrites_silently() {
        let mut registry = FunctionRegistry::new();
        registry
            .register("plus", |a: i64, b: i64| a * b)
            .unwrap();
        assert_eq!(render(&registry, "{{ plus(3, 4) }}"), "12");
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_register_rejects_invalid_names() {
        let mut registry = FunctionRegistry::new();
        for name in ["", "9lives", "with-dash", "dotted.name", "spa ce"] {
            let result = registry.register(name, || "x");
            assert!(
                matches!(result, Err(ViewError::Registration { .. })),
                "expected registration error for {:?}",
                name
            );
        }
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_install_is_a_snapshot() {
        let mut registry = FunctionRegistry::new();
        let mut env = Environment::new();
        registry.install(&mut env);

        registry.register("late", || "late").unwrap();
        assert!(env.render_str("{{ late() }}", ()).is_err());
    }

    proptest! {
        #[test]
        fn prop_indent_length(s in "[a-z]{0,5}", n in 0i64..20) {
            let registry = FunctionRegistry::new();
            let mut env = Environment::new();
            registry.install(&mut env);
            let out = env
                .render_str("{{ indent(s, n) }}", minijinja::context! { s => s.clone(), n => n })
                .unwrap();
            prop_assert_eq!(out, s.repeat(n as usize));
        }
    }
}
