//! Asset serving for the `/static/` prefix route.
//!
//! The route only runs the standard chain: no session, no CSRF check.
//! Directories are not listed.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tracing::error;

use crate::handler::{boxed, BoxedHandler};
use crate::request::Request;
use crate::response::Response;
use crate::router::REST_PARAM;
use crate::status::Status;

pub struct StaticFiles {
    base_dir: PathBuf,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self { base_dir: base.into() }
    }

    /// Joins `rel` onto the base directory, refusing anything that could
    /// climb out of it.
    fn map_path(&self, rel: &str) -> Option<PathBuf> {
        let mut pb = self.base_dir.clone();
        for comp in Path::new(rel.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    fn content_type(path: &Path) -> &'static str {
        match path.extension().and_then(|s| s.to_str()).unwrap_or("").to_lowercase().as_str() {
            "html" => "text/html; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "js" => "application/javascript",
            "json" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "svg" => "image/svg+xml",
            "ico" => "image/x-icon",
            _ => "application/octet-stream",
        }
    }

    async fn load(&self, rel: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let path = self
            .map_path(rel)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if !tokio::fs::metadata(&path).await?.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a file"));
        }
        let bytes = tokio::fs::read(&path).await?;
        Ok((bytes, Self::content_type(&path)))
    }

    /// Handler for a prefix route; serves the path remainder below the base
    /// directory.
    pub fn into_handler(self) -> BoxedHandler {
        let files = Arc::new(self);
        boxed(move |req: Request| {
            let files = Arc::clone(&files);
            async move {
                let rel = req.param(REST_PARAM).unwrap_or("");
                match files.load(rel).await {
                    Ok((body, content_type)) => Response::builder().bytes(content_type, body),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Response::error(Status::NotFound),
                    Err(e) => {
                        error!(error = %e, path = %req.path(), "static file read failed");
                        Response::error(Status::InternalServerError)
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{Resolution, Router};

    #[test]
    fn map_path_prevents_traversal() {
        let sf = StaticFiles::new("ui/static");
        assert!(sf.map_path("../Cargo.toml").is_none());
        assert!(sf.map_path("css/../../Cargo.toml").is_none());
        assert_eq!(sf.map_path("css/main.css"), Some(PathBuf::from("ui/static/css/main.css")));
    }

    async fn get(path: &str) -> Response {
        let router = Router::new()
            .get("/static/", StaticFiles::new(concat!(env!("CARGO_MANIFEST_DIR"), "/ui/static")).into_handler())
            .unwrap();
        let Resolution::Matched { handler, params } = router.resolve("GET", path) else {
            panic!("static route should match {path}");
        };
        let mut req = Request::new("GET", path);
        req.set_params(params);
        handler.call(req).await
    }

    #[tokio::test]
    async fn serves_files_with_their_content_type() {
        let res = get("/static/css/main.css").await;
        assert_eq!(res.status_code(), 200);
        assert_eq!(res.header("content-type"), Some("text/css; charset=utf-8"));
        assert!(res.body_text().contains(".flash"));
    }

    #[tokio::test]
    async fn missing_files_and_directories_are_404() {
        assert_eq!(get("/static/css/missing.css").await.status_code(), 404);
        assert_eq!(get("/static/css").await.status_code(), 404);
        assert_eq!(get("/static/").await.status_code(), 404);
    }
}
