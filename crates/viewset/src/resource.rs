//! Static resource mounts.
//!
//! A mount binds a URL prefix to a directory. Requests under the prefix have
//! it stripped and are answered with the file at the remaining path:
//!
//! ```text
//! mount("/static/", "./public")
//! GET /static/css/app.css  ->  ./public/css/app.css
//! GET /static/docs/        ->  ./public/docs/index.html
//! ```
//!
//! Directories are not checked when mounting; a missing directory simply
//! yields 404 responses. Requests are answered through `tiny_http`, either
//! one at a time with [`ResourceMounts::respond`] or with the blocking loop
//! in [`ResourceMounts::serve`].

use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};

use tiny_http::{Header, Request, Response, Server, StatusCode};

/// One URL prefix served from one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMount {
    prefix: String,
    dir: PathBuf,
}

impl ResourceMount {
    pub fn new(prefix: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            dir: dir.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a decoded request path under this prefix to a filesystem path.
    ///
    /// Returns `None` if the path is outside the prefix or tries to leave
    /// the mounted directory.
    fn map(&self, path: &str) -> Option<PathBuf> {
        let rest = path.strip_prefix(&self.prefix)?;
        let relative = Path::new(rest.trim_start_matches('/'));

        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }

        let local = self.dir.join(relative);
        if local.is_dir() {
            return Some(local.join("index.html"));
        }
        Some(local)
    }
}

/// The set of mounts installed on a view.
///
/// When several prefixes match a request, the longest one wins.
#[derive(Debug, Clone, Default)]
pub struct ResourceMounts {
    mounts: Vec<ResourceMount>,
}

impl ResourceMounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mount, replacing an existing mount with the same prefix.
    pub fn mount(&mut self, prefix: impl Into<String>, dir: impl Into<PathBuf>) {
        let mount = ResourceMount::new(prefix, dir);
        match self.mounts.iter_mut().find(|m| m.prefix == mount.prefix) {
            Some(existing) => *existing = mount,
            None => self.mounts.push(mount),
        }
    }

    pub fn get(&self, prefix: &str) -> Option<&ResourceMount> {
        self.mounts.iter().find(|m| m.prefix == prefix)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceMount> {
        self.mounts.iter()
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Resolves a request URL to the file it should be answered with.
    ///
    /// The query string is dropped and the path is percent-decoded before
    /// matching. The returned path is not checked for existence.
    pub fn resolve(&self, url: &str) -> Option<PathBuf> {
        let raw_path = url.split(['?', '#']).next().unwrap_or(url);
        let path = urlencoding::decode(raw_path).ok()?;

        self.mounts
            .iter()
            .filter(|m| path.starts_with(m.prefix.as_str()))
            .max_by_key(|m| m.prefix.len())
            .and_then(|m| m.map(&path))
    }

    /// Answers a single request with a mounted file or a 404.
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be written to the client.
    pub fn respond(&self, request: Request) -> std::io::Result<()> {
        let Some(path) = self.resolve(request.url()).filter(|p| p.is_file()) else {
            tracing::debug!(url = request.url(), "resource not found");
            return request.respond(status_response(404, "404 Not Found"));
        };

        match fs::read(&path) {
            Ok(content) => {
                let mut response = Response::from_data(content);
                if let Ok(header) = Header::from_bytes("Content-Type", guess_content_type(&path)) {
                    response = response.with_header(header);
                }
                request.respond(response)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read resource");
                request.respond(status_response(500, "500 Internal Server Error"))
            }
        }
    }

    /// Answers requests from `server` until it is unblocked.
    ///
    /// Failures to answer a single request are logged and do not stop the loop.
    pub fn serve(&self, server: &Server) {
        for request in server.incoming_requests() {
            let url = request.url().to_string();
            if let Err(err) = self.respond(request) {
                tracing::warn!(url = %url, error = %err, "failed to answer resource request");
            }
        }
    }
}

fn status_response(code: u16, body: &'static str) -> Response<Cursor<Vec<u8>>> {
    let mut response = Response::from_data(body.as_bytes().to_vec()).with_status_code(StatusCode(code));
    if let Ok(header) = Header::from_bytes("Content-Type", "text/plain; charset=utf-8") {
        response = response.with_header(header);
    }
    response
}

/// Maps the extension of a served file to its `Content-Type`.
fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}
