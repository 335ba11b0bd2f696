//! Crash-safe persistence of screenshot buffers.
//!
//! Every screenshot is published atomically: bytes land in a hidden temp
//! file first and are renamed into place afterwards, so a concurrent reader
//! never observes a partially-written file. Temp paths sit in an in-flight
//! registry for the duration of the save; an interrupt or a write error
//! rolls back whatever is still in flight while leaving already-published
//! files intact.

use crate::{PagesnapError, RunMetrics, Screenshot};
use dashmap::DashSet;
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once, OnceLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Tracks temp files currently being written.
///
/// One process-wide instance backs the interrupt handler; tests construct
/// private instances to exercise rollback without signals.
#[derive(Debug, Default)]
pub struct TempFileRegistry {
    files: DashSet<PathBuf>,
}

impl TempFileRegistry {
    pub fn new() -> Self {
        Self {
            files: DashSet::new(),
        }
    }

    /// The registry shared by every persister in this process.
    pub fn global() -> &'static Arc<TempFileRegistry> {
        static GLOBAL: OnceLock<Arc<TempFileRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(TempFileRegistry::new()))
    }

    pub fn register(&self, path: PathBuf) {
        self.files.insert(path);
    }

    pub fn unregister(&self, path: &Path) {
        self.files.remove(path);
    }

    pub fn in_flight(&self) -> usize {
        self.files.len()
    }

    /// Delete every registered temp file, best effort, and clear the
    /// registry. Published (already renamed) files are untouched.
    pub async fn cleanup(&self) {
        let paths: Vec<PathBuf> = self.files.iter().map(|entry| entry.clone()).collect();
        self.files.clear();

        for path in paths {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), "failed to remove temp file: {e}");
            }
        }
    }
}

/// Install the process-wide interrupt listener, at most once.
///
/// On ctrl-c, in-flight temp files are removed before the process exits.
/// Renderer processes already at work are not forcibly killed; cleanup is
/// scoped to filesystem state.
pub fn install_interrupt_handler() {
    static INSTALLED: Once = Once::new();
    INSTALLED.call_once(|| {
        tokio::spawn(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                TempFileRegistry::global().cleanup().await;
                std::process::exit(1);
            }
        });
    });
}

/// Writes screenshot buffers to a destination directory with atomic-publish
/// semantics and all-or-nothing failure behavior.
pub struct AtomicPersister {
    registry: Arc<TempFileRegistry>,
    metrics: RunMetrics,
}

impl AtomicPersister {
    pub fn new(metrics: RunMetrics) -> Self {
        Self {
            registry: TempFileRegistry::global().clone(),
            metrics,
        }
    }

    pub fn with_registry(registry: Arc<TempFileRegistry>, metrics: RunMetrics) -> Self {
        Self { registry, metrics }
    }

    /// Persist every screenshot into `destination`, creating it if missing.
    ///
    /// Writes proceed in parallel. On any write error the in-flight temp
    /// files are rolled back before the error surfaces.
    pub async fn save(
        &self,
        screenshots: &[Screenshot],
        destination: &Path,
    ) -> Result<(), PagesnapError> {
        tokio::fs::create_dir_all(destination).await?;
        install_interrupt_handler();

        let result = try_join_all(
            screenshots
                .iter()
                .map(|screenshot| self.write_one(screenshot, destination)),
        )
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                self.registry.cleanup().await;
                Err(e)
            }
        }
    }

    async fn write_one(
        &self,
        screenshot: &Screenshot,
        destination: &Path,
    ) -> Result<(), PagesnapError> {
        let final_path = destination.join(&screenshot.filename);
        let temp_path =
            destination.join(format!(".{}.{}.tmp", screenshot.filename, Uuid::new_v4()));

        self.registry.register(temp_path.clone());

        let write = async {
            tokio::fs::write(&temp_path, &screenshot.data).await?;
            tokio::fs::rename(&temp_path, &final_path).await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        match write {
            Ok(()) => {
                self.registry.unregister(&temp_path);
                self.metrics.record_bytes_written(screenshot.data.len());
                debug!(path = %final_path.display(), "screenshot written");
                Ok(())
            }
            Err(e) => {
                // The temp file may exist if only the rename failed.
                let _ = tokio::fs::remove_file(&temp_path).await;
                self.registry.unregister(&temp_path);
                Err(PagesnapError::Persistence(format!(
                    "{}: {e}",
                    final_path.display()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_destination() -> PathBuf {
        std::env::temp_dir().join(format!("pagesnap-persist-{}", Uuid::new_v4()))
    }

    fn screenshot(filename: &str) -> Screenshot {
        Screenshot {
            data: vec![0x89, 0x50, 0x4e, 0x47],
            filename: filename.to_string(),
        }
    }

    fn test_persister() -> (AtomicPersister, Arc<TempFileRegistry>) {
        let registry = Arc::new(TempFileRegistry::new());
        (
            AtomicPersister::with_registry(registry.clone(), RunMetrics::new()),
            registry,
        )
    }

    #[tokio::test]
    async fn save_publishes_files_without_temp_residue() {
        let destination = temp_destination();
        let (persister, registry) = test_persister();

        persister
            .save(&[screenshot("a.png"), screenshot("b.png")], &destination)
            .await
            .unwrap();

        assert!(destination.join("a.png").exists());
        assert!(destination.join("b.png").exists());
        assert_eq!(registry.in_flight(), 0);

        let leftovers: Vec<_> = std::fs::read_dir(&destination)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        std::fs::remove_dir_all(&destination).unwrap();
    }

    #[tokio::test]
    async fn save_creates_destination_recursively() {
        let destination = temp_destination().join("nested").join("dir");
        let (persister, _registry) = test_persister();

        persister
            .save(&[screenshot("shot.png")], &destination)
            .await
            .unwrap();

        assert!(destination.join("shot.png").exists());
        std::fs::remove_dir_all(destination.parent().unwrap().parent().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn interrupt_style_cleanup_removes_in_flight_temp_files() {
        let destination = temp_destination();
        std::fs::create_dir_all(&destination).unwrap();
        let registry = Arc::new(TempFileRegistry::new());

        // Simulate writes caught mid-flight by an interrupt.
        for i in 0..3 {
            let path = destination.join(format!(".shot{i}.png.{}.tmp", Uuid::new_v4()));
            std::fs::write(&path, b"partial").unwrap();
            registry.register(path);
        }
        assert_eq!(registry.in_flight(), 3);

        registry.cleanup().await;

        assert_eq!(registry.in_flight(), 0);
        assert_eq!(std::fs::read_dir(&destination).unwrap().count(), 0);
        std::fs::remove_dir_all(&destination).unwrap();
    }

    #[tokio::test]
    async fn cleanup_leaves_published_files_intact() {
        let destination = temp_destination();
        std::fs::create_dir_all(&destination).unwrap();
        let registry = Arc::new(TempFileRegistry::new());

        std::fs::write(destination.join("done.png"), b"published").unwrap();
        let temp = destination.join(".pending.png.tmp");
        std::fs::write(&temp, b"partial").unwrap();
        registry.register(temp);

        registry.cleanup().await;

        assert!(destination.join("done.png").exists());
        assert!(!destination.join(".pending.png.tmp").exists());
        std::fs::remove_dir_all(&destination).unwrap();
    }

    #[tokio::test]
    async fn rename_error_removes_the_written_temp_file() {
        let destination = temp_destination();
        let (persister, registry) = test_persister();

        // A directory occupying the final path makes the rename fail after
        // the temp file has been written.
        std::fs::create_dir_all(destination.join("shot.png")).unwrap();

        let result = persister.save(&[screenshot("shot.png")], &destination).await;
        assert!(matches!(result, Err(PagesnapError::Persistence(_))));
        assert_eq!(registry.in_flight(), 0);

        let leftovers: Vec<_> = std::fs::read_dir(&destination)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        std::fs::remove_dir_all(&destination).unwrap();
    }

    #[tokio::test]
    async fn write_error_rolls_back_and_surfaces() {
        let destination = temp_destination();
        let (persister, registry) = test_persister();

        // A filename with a path separator forces the rename to fail.
        let bad = Screenshot {
            data: vec![1, 2, 3],
            filename: "missing-dir/shot.png".to_string(),
        };

        let result = persister.save(&[bad], &destination).await;
        assert!(matches!(result, Err(PagesnapError::Persistence(_))));
        assert_eq!(registry.in_flight(), 0);

        std::fs::remove_dir_all(&destination).unwrap();
    }
}
