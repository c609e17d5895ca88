use thiserror::Error;

/// Failure to produce an object graph for an asset path.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse glTF {path}: {source}")]
    Gltf {
        path: String,
        #[source]
        source: gltf::Error,
    },

    #[error("{path} contains no animation clips")]
    NoAnimation { path: String },

    #[error("mesh in {path} has no position data")]
    MissingPositions { path: String },
}

impl AssetError {
    pub fn path(&self) -> &str {
        match self {
            AssetError::Fetch { path, .. }
            | AssetError::Io { path, .. }
            | AssetError::Gltf { path, .. }
            | AssetError::NoAnimation { path }
            | AssetError::MissingPositions { path } => path,
        }
    }
}

/// Failures that stop the application before the first frame.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("no global `window`")]
    NoWindow,

    #[error("no document on window")]
    NoDocument,

    #[error("failed to create the render canvas")]
    Canvas,

    #[error("failed to create render surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter found")]
    NoAdapter,

    #[error("render surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("failed to request GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}
