//! Config writer: full-replace publish of the generated host files.
//!
//! ## `publish` protocol
//!
//! 1. Check the output directory exists.
//! 2. Partition the records (a render error stops here, before deletion).
//! 3. Delete every file following the generated naming convention.
//! 4. Render each partition, append its `.static` fragment when present.
//! 5. Write to `<name>.fleetwatch.tmp`, then rename to the final path.

use std::path::{Path, PathBuf};

use fleetwatch_core::{HostRecord, Schema, SplitBy};
use fleetwatch_renderer::{is_generated_file_name, Renderer, FRAGMENT_SUFFIX};

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written with `hosts` blocks.
    Written { path: PathBuf, hosts: usize },
    /// A previously generated file was deleted.
    Removed { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path, .. } | WriteResult::Removed { path } => path,
        }
    }
}

// ---------------------------------------------------------------------------
// publish
// ---------------------------------------------------------------------------

/// Regenerate the complete set of host files in `dir` from `records`.
///
/// Removals are reported first, followed by one `Written` per partition in
/// partition order. A file deleted and rewritten under the same name is
/// reported only as `Written`.
pub fn publish(
    dir: &Path,
    schema: &Schema,
    records: &[HostRecord],
    split_by: &SplitBy,
) -> Result<Vec<WriteResult>, SyncError> {
    if !dir.is_dir() {
        return Err(SyncError::MissingConfigDir {
            path: dir.to_path_buf(),
        });
    }

    let renderer = Renderer::new(schema.clone(), split_by.clone());
    let partitions = renderer.partition(records)?;

    let removed = remove_generated(dir)?;
    let mut results: Vec<WriteResult> = removed
        .into_iter()
        .filter(|path| {
            !partitions
                .iter()
                .any(|p| path.file_name().is_some_and(|n| n == p.file_name.as_str()))
        })
        .map(|path| WriteResult::Removed { path })
        .collect();

    for partition in &partitions {
        let path = dir.join(&partition.file_name);
        let mut content = renderer.render(partition);
        if let Some(fragment) = read_fragment(dir, &partition.file_name)? {
            content.push_str(&fragment);
        }
        atomic_write(&path, &content)?;
        tracing::info!(
            "wrote {} ({} hosts)",
            path.display(),
            partition.records.len()
        );
        results.push(WriteResult::Written {
            path,
            hosts: partition.records.len(),
        });
    }

    Ok(results)
}

/// Write `content` to `<path>.fleetwatch.tmp` and rename it over `path`.
pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.fleetwatch.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

/// Delete every generated file in `dir`; returns the deleted paths, sorted.
fn remove_generated(dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut removed = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| io_err(entry.path(), e))?
            .is_file();
        let name = entry.file_name();
        if !is_file || !name.to_str().is_some_and(is_generated_file_name) {
            continue;
        }
        let path = entry.path();
        std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
        tracing::debug!("removed {}", path.display());
        removed.push(path);
    }
    removed.sort();
    Ok(removed)
}

fn read_fragment(dir: &Path, file_name: &str) -> Result<Option<String>, SyncError> {
    let path = dir.join(format!("{file_name}{FRAGMENT_SUFFIX}"));
    match std::fs::read_to_string(&path) {
        Ok(contents) => {
            tracing::debug!("appending fragment {}", path.display());
            Ok(Some(contents))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_err(&path, e)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::new("host_name", vec!["host_name".into(), "region".into()]).unwrap()
    }

    fn host(name: &str, region: &str) -> HostRecord {
        [("host_name", name), ("region", region)].into_iter().collect()
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn missing_dir_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = publish(&tmp.path().join("absent"), &schema(), &[], &SplitBy::None).unwrap_err();
        assert!(matches!(err, SyncError::MissingConfigDir { .. }));
    }

    #[test]
    fn unsplit_writes_single_file() {
        let tmp = TempDir::new().unwrap();
        let results = publish(
            tmp.path(),
            &schema(),
            &[host("b", "eu"), host("a", "us")],
            &SplitBy::None,
        )
        .unwrap();

        assert_eq!(
            results,
            vec![WriteResult::Written {
                path: tmp.path().join("fleetwatch.cfg"),
                hosts: 2
            }]
        );
        let content = fs::read_to_string(tmp.path().join("fleetwatch.cfg")).unwrap();
        assert_eq!(content.matches("define host {").count(), 2);
        assert!(content.find("\ta\n").unwrap() < content.find("\tb\n").unwrap());
    }

    #[test]
    fn stale_generated_files_are_removed_others_kept() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("fleetwatch_old.cfg"), "stale").unwrap();
        fs::write(tmp.path().join("commands.cfg"), "keep").unwrap();
        fs::write(tmp.path().join("fleetwatch_eu.cfg.static"), "# static\n").unwrap();

        let results = publish(
            tmp.path(),
            &schema(),
            &[host("a", "eu")],
            &SplitBy::Field("region".into()),
        )
        .unwrap();

        assert_eq!(
            results,
            vec![
                WriteResult::Removed {
                    path: tmp.path().join("fleetwatch_old.cfg")
                },
                WriteResult::Written {
                    path: tmp.path().join("fleetwatch_eu.cfg"),
                    hosts: 1
                },
            ]
        );
        assert_eq!(
            names(tmp.path()),
            vec!["commands.cfg", "fleetwatch_eu.cfg", "fleetwatch_eu.cfg.static"]
        );
    }

    #[test]
    fn fragment_is_appended_verbatim() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("fleetwatch.cfg.static"),
            "define host {\n\thost_name\tmanual\n}\n",
        )
        .unwrap();

        publish(tmp.path(), &schema(), &[host("a", "eu")], &SplitBy::None).unwrap();

        let content = fs::read_to_string(tmp.path().join("fleetwatch.cfg")).unwrap();
        assert!(content.ends_with("}\n\ndefine host {\n\thost_name\tmanual\n}\n"));
    }

    #[test]
    fn empty_record_set_unsplit_still_writes_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("fleetwatch.cfg"), "old").unwrap();
        publish(tmp.path(), &schema(), &[], &SplitBy::None).unwrap();
        assert_eq!(fs::read_to_string(tmp.path().join("fleetwatch.cfg")).unwrap(), "");
    }

    #[test]
    fn no_tmp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        publish(
            tmp.path(),
            &schema(),
            &[host("a", "eu"), host("b", "us")],
            &SplitBy::Field("region".into()),
        )
        .unwrap();
        assert!(names(tmp.path()).iter().all(|n| !n.ends_with(".tmp")));
    }

    #[test]
    fn colliding_split_values_share_one_file() {
        let tmp = TempDir::new().unwrap();
        let results = publish(
            tmp.path(),
            &schema(),
            &[host("a", "us east"), host("b", "us/east")],
            &SplitBy::Field("region".into()),
        )
        .unwrap();

        assert_eq!(
            results,
            vec![WriteResult::Written {
                path: tmp.path().join("fleetwatch_us_east.cfg"),
                hosts: 2
            }]
        );
        let content = fs::read_to_string(tmp.path().join("fleetwatch_us_east.cfg")).unwrap();
        assert_eq!(content.matches("define host {").count(), 2);
    }

    #[test]
    fn render_error_leaves_existing_files() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("fleetwatch_eu.cfg"), "previous").unwrap();
        let schema = Schema::new("host_name", vec!["host_name".into(), "region".into()]).unwrap();
        let bare: HostRecord = [("host_name", "a")].into_iter().collect();

        let err = publish(
            tmp.path(),
            &schema,
            &[bare],
            &SplitBy::Field("region".into()),
        )
        .unwrap_err();
        assert!(matches!(err, SyncError::Render(_)));
        assert_eq!(
            fs::read_to_string(tmp.path().join("fleetwatch_eu.cfg")).unwrap(),
            "previous"
        );
    }
}
