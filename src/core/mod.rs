//! Core types shared by every stage of a build.

mod asset;
mod context;
mod manifest;
mod state;

pub use asset::{Asset, AssetKind, Emit, Reference, SideAsset};
pub use context::{BuildContext, CancelToken};
pub use manifest::{BuildManifest, ManifestEntry, OutputRef};
pub use state::{register_server, setup_shutdown_handler};
