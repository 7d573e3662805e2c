//! Loading generated artifacts.
//!
//! The crate never imports or compiles what it generates. Hosts that want to
//! run generated code implement [`ArtifactLoader`] (a Python import by path,
//! a `dlopen` of a compiled header wrapper, ...) and hand it in.

use crate::codegen::artifact_path;
use crate::error::{CodegenError, CodegenResult};
use crate::geo::{GroupKind, GroupOp};
use crate::printer::CodegenMode;
use log::debug;
use std::fs;
use std::path::Path;

/// Capability to load an artifact from a path.
pub trait ArtifactLoader {
    type Handle;
    type Error;

    fn load(&self, path: &Path) -> Result<Self::Handle, Self::Error>;
}

/// Load the artifact generated for `group.op` under `root`.
pub fn load_generated<L: ArtifactLoader>(
    loader: &L,
    root: &Path,
    group: GroupKind,
    op: GroupOp,
    mode: CodegenMode,
) -> Result<L::Handle, L::Error> {
    let path = artifact_path(root, group, op, mode);
    debug!("loading {}.{} from {}", group, op, path.display());
    loader.load(&path)
}

/// Loads an artifact as its source text.
#[derive(Clone, Copy, Debug, Default)]
pub struct SourceLoader;

impl ArtifactLoader for SourceLoader {
    type Handle = String;
    type Error = CodegenError;

    fn load(&self, path: &Path) -> CodegenResult<String> {
        fs::read_to_string(path).map_err(|source| CodegenError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{render_file, write_package};
    use std::cell::RefCell;
    use std::path::PathBuf;

    /// Records requested paths instead of loading.
    #[derive(Default)]
    struct RecordingLoader {
        requested: RefCell<Vec<PathBuf>>,
    }

    impl ArtifactLoader for RecordingLoader {
        type Handle = usize;
        type Error = ();

        fn load(&self, path: &Path) -> Result<usize, ()> {
            let mut requested = self.requested.borrow_mut();
            requested.push(path.to_path_buf());
            Ok(requested.len())
        }
    }

    #[test]
    fn test_load_generated_resolves_artifact_path() {
        let loader = RecordingLoader::default();
        let root = Path::new("gen");
        load_generated(&loader, root, GroupKind::Pose3, GroupOp::Compose, CodegenMode::Cpp).unwrap();
        assert_eq!(
            loader.requested.borrow().as_slice(),
            &[root.join("pose3").join("Compose.h")]
        );
    }

    #[test]
    fn test_source_loader_reads_written_package() {
        let dir = tempfile::tempdir().unwrap();
        write_package(dir.path(), CodegenMode::Python3).unwrap();

        let text = load_generated(
            &SourceLoader,
            dir.path(),
            GroupKind::Pose2,
            GroupOp::Between,
            CodegenMode::Python3,
        )
        .unwrap();
        assert_eq!(
            text,
            render_file(GroupKind::Pose2, GroupOp::Between, CodegenMode::Python3).unwrap()
        );
    }

    #[test]
    fn test_source_loader_reports_missing_path() {
        let err = SourceLoader.load(Path::new("/nonexistent/pose2/compose.py")).unwrap_err();
        assert!(matches!(err, CodegenError::Io { .. }));
        assert!(err.to_string().contains("compose.py"));
    }
}
