//! Artifact egress
//!
//! Operations on a finalized artifact: local export and remote upload. The
//! upload destination is an external collaborator behind [`StorageSink`];
//! the pipeline only needs "store bytes, get back a locator".

mod sink;

use std::path::Path;

pub use sink::{HttpStorageSink, StorageSink};

use crate::recorder::artifact::Artifact;
use crate::utils::error::PipelineResult;

/// Write the artifact's bytes to a caller-visible location.
///
/// Pure and repeatable: exporting mutates nothing and may be invoked any
/// number of times on the same artifact.
pub async fn export_artifact(artifact: &Artifact, path: &Path) -> PipelineResult<()> {
    tokio::fs::write(path, &artifact.data).await?;
    tracing::info!(
        path = %path.display(),
        bytes = artifact.data.len(),
        "exported artifact"
    );
    Ok(())
}
