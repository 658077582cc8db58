use bytes::Bytes;
use std::env;
use std::path::{Component, Path, PathBuf};

///
/// RESOURCES_DIR, when set, dictates where static content is served from.
///
pub const RESOURCES_DIR_VAR: &str = "RESOURCES_DIR";
pub const DEFAULT_RESOURCES_DIR: &str = "/var/www/hearth";

const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];
const NOT_FOUND_PAGE: &str = "404.html";

///
/// What a URI resolved to on disk.
///
#[derive(Debug, PartialEq, Eq)]
pub enum StaticContent {
    Html(String),
    Binary { data: Bytes, mime: &'static str },
}

///
/// Maps request URIs onto files under a resource root.
///
/// A URI ending in `/` is served by its `index.html` or `index.htm`, a URI
/// whose last segment has no extension gets `.html` appended, and anything
/// else is taken as is. Only html, css and a few image types are served.
///
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        StaticFiles { root: root.into() }
    }

    ///
    /// Build from the `RESOURCES_DIR` environment variable, falling back to
    /// the default location.
    ///
    pub fn from_env() -> Self {
        match env::var(RESOURCES_DIR_VAR) {
            Ok(dir) => {
                info!("Resource directory found in environment: {}", dir);
                StaticFiles::new(dir)
            }
            Err(_) => {
                warn!(
                    "Resource directory not found in environment. Defaulting to {}",
                    DEFAULT_RESOURCES_DIR
                );
                StaticFiles::new(DEFAULT_RESOURCES_DIR)
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Anything other than plain segments (`..`, a second root) leaves the
    // resource root and is refused.
    fn map_path(&self, uri: &str) -> Option<PathBuf> {
        let mut pb = self.root.clone();
        for comp in Path::new(uri.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    ///
    /// The file a URI refers to. `None` only when the URI tries to escape the
    /// resource root; the returned path may still not exist.
    ///
    pub async fn file_path(&self, uri: &str) -> Option<PathBuf> {
        if uri.ends_with('/') {
            let dir = self.map_path(uri)?;

            for index in INDEX_FILES.iter() {
                let candidate = dir.join(index);
                if is_file(&candidate).await {
                    return Some(candidate);
                }
            }

            return Some(dir);
        }

        let last_segment = uri.rsplit('/').next().unwrap_or("");
        if last_segment.contains('.') {
            self.map_path(uri)
        } else {
            self.map_path(&format!("{}.html", uri))
        }
    }

    ///
    /// Load the content for a URI, or `None` when there is nothing servable
    /// there.
    ///
    pub async fn resolve(&self, uri: &str) -> Option<StaticContent> {
        let path = self.file_path(uri).await?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "html" | "htm" => match tokio::fs::read_to_string(&path).await {
                Ok(html) => {
                    debug!("Returning HTML file {} for URI {}", path.display(), uri);
                    Some(StaticContent::Html(html))
                }
                Err(e) => {
                    debug!("Unable to read {}: {}", path.display(), e);
                    None
                }
            },
            other => {
                let mime = mime_for(other)?;
                match tokio::fs::read(&path).await {
                    Ok(data) => {
                        debug!("Returning {} file {} for URI {}", mime, path.display(), uri);
                        Some(StaticContent::Binary {
                            data: Bytes::from(data),
                            mime,
                        })
                    }
                    Err(e) => {
                        debug!("Unable to read {}: {}", path.display(), e);
                        None
                    }
                }
            }
        }
    }

    ///
    /// The custom not-found page at the resource root, if it can be read.
    ///
    pub async fn not_found_page(&self) -> Option<String> {
        tokio::fs::read_to_string(self.root.join(NOT_FOUND_PAGE))
            .await
            .ok()
    }
}

fn mime_for(extension: &str) -> Option<&'static str> {
    match extension {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "css" => Some("text/css"),
        _ => None,
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
