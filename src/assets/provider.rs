use futures::future::{FutureExt, LocalBoxFuture};

use crate::assets::glb::parse_glb;
use crate::assets::AssetProvider;
use crate::error::AssetError;
use crate::model::ObjectGraph;

/// Default directory (or URL prefix) that asset paths are resolved against.
pub const DEFAULT_ASSET_ROOT: &str = "static";

/// Loads `.glb` files: `fetch` relative to the page on the web, the
/// filesystem on native.
#[derive(Debug, Clone)]
pub struct GltfAssetProvider {
    root: String,
}

impl GltfAssetProvider {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    /// Native builds honour `ASTRAWALK_ASSET_ROOT`.
    pub fn from_env() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                Self::new(DEFAULT_ASSET_ROOT)
            } else {
                Self::new(std::env::var("ASTRAWALK_ASSET_ROOT").unwrap_or_else(|_| DEFAULT_ASSET_ROOT.to_string()))
            }
        }
    }

    pub fn resolve(&self, path: &str) -> String {
        let root = self.root.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if root.is_empty() {
            path.to_string()
        } else {
            format!("{root}/{path}")
        }
    }
}

impl Default for GltfAssetProvider {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AssetProvider for GltfAssetProvider {
    fn load(&self, path: &str) -> LocalBoxFuture<'_, Result<ObjectGraph, AssetError>> {
        let location = self.resolve(path);
        let path = path.to_string();
        async move {
            let bytes = read_bytes(&path, &location).await?;
            parse_glb(&path, &bytes)
        }
        .boxed_local()
    }
}

#[cfg(target_arch = "wasm32")]
async fn read_bytes(path: &str, url: &str) -> Result<Vec<u8>, AssetError> {
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let fetch_error = |reason: String| AssetError::Fetch { path: path.to_string(), reason };
    let js_reason = |e: wasm_bindgen::JsValue| e.as_string().unwrap_or_else(|| format!("{e:?}"));

    let window = web_sys::window().ok_or_else(|| fetch_error("no global `window`".to_string()))?;
    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| fetch_error(js_reason(e)))?;
    let response: web_sys::Response = response
        .dyn_into()
        .map_err(|_| fetch_error("fetch did not return a Response".to_string()))?;
    if !response.ok() {
        return Err(fetch_error(format!("HTTP {}", response.status())));
    }
    let buffer = JsFuture::from(response.array_buffer().map_err(|e| fetch_error(js_reason(e)))?)
        .await
        .map_err(|e| fetch_error(js_reason(e)))?;
    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

#[cfg(not(target_arch = "wasm32"))]
async fn read_bytes(path: &str, file: &str) -> Result<Vec<u8>, AssetError> {
    std::fs::read(file).map_err(|source| AssetError::Io { path: path.to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_under_the_root() {
        let provider = GltfAssetProvider::new("static/");
        assert_eq!(provider.resolve("models/astra.glb"), "static/models/astra.glb");
        assert_eq!(provider.resolve("/models/astra.glb"), "static/models/astra.glb");
        assert_eq!(GltfAssetProvider::new("").resolve("models/astra.glb"), "models/astra.glb");
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn missing_file_is_an_io_error_for_the_logical_path() {
        let provider = GltfAssetProvider::new("/definitely/not/here");
        let err = futures::executor::block_on(provider.load("models/astra.glb")).unwrap_err();
        assert!(matches!(err, AssetError::Io { .. }));
        assert_eq!(err.path(), "models/astra.glb");
    }
}
