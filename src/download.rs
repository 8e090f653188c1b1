//! Artifact download
//!
//! A download target is either an absolute locator, the project archive
//! (`zip`), or an artifact type looked up in the last compile's outputs.
//! Bodies are streamed into a `.part` sibling and renamed once complete.

use crate::client::{is_absolute_url, ServiceClient};
use crate::compile::OutputSet;
use crate::error::{OlError, OlResult};
use crate::session::Session;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read buffer size used while streaming
pub const CHUNK_SIZE: usize = 8192;

/// Artifact type of the project archive
pub const ARCHIVE: &str = "zip";

/// A download target resolved to a concrete URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub url: String,
    pub kind: String,
}

impl ResolvedTarget {
    /// File name used when no destination is given
    pub fn default_file_name(&self, project_id: Option<&str>) -> String {
        match project_id {
            Some(id) if self.kind == ARCHIVE => format!("{}.{}", id, ARCHIVE),
            _ => format!("output.{}", self.kind),
        }
    }
}

/// Resolve a locator or artifact type to a URL
pub fn resolve_target(
    client: &ServiceClient,
    target: &str,
    project_id: Option<&str>,
    outputs: Option<&OutputSet>,
) -> OlResult<ResolvedTarget> {
    if is_absolute_url(target) {
        return Ok(ResolvedTarget {
            url: target.to_string(),
            kind: locator_suffix(target).unwrap_or("bin").to_string(),
        });
    }

    if target == ARCHIVE {
        let project_id = project_id.ok_or_else(|| {
            OlError::User("Downloading the project archive requires --project".to_string())
        })?;
        return Ok(ResolvedTarget {
            url: client.url(&format!("/project/{}/download/zip", project_id)),
            kind: ARCHIVE.to_string(),
        });
    }

    let locator = outputs.and_then(|o| o.get(target)).ok_or_else(|| {
        let available = outputs
            .map(|o| o.kinds().collect::<Vec<_>>().join(", "))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "none".to_string());
        OlError::UnknownArtifact {
            kind: target.to_string(),
            available,
        }
    })?;

    Ok(ResolvedTarget {
        url: client.url(locator),
        kind: target.to_string(),
    })
}

/// Suffix of the last path segment of a locator, ignoring query and fragment
fn locator_suffix(locator: &str) -> Option<&str> {
    let path = locator.split(['?', '#']).next()?;
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let (_, segment) = path.split_once('/')?;
    let name = segment.rsplit('/').next()?;
    let (stem, suffix) = name.rsplit_once('.')?;
    (!stem.is_empty() && !suffix.is_empty()).then_some(suffix)
}

/// Number of progress marks for a byte count: one per doubling past a chunk
pub fn progress_marks(bytes: u64) -> u32 {
    let chunk = CHUNK_SIZE as u64;
    if bytes < chunk {
        0
    } else {
        (bytes / chunk).ilog2() + 1
    }
}

/// Receives download progress
pub trait ProgressSink {
    /// Called once before the first chunk with the declared length, if any
    fn begin(&mut self, _total: Option<u64>) {}

    /// Called after every chunk with the cumulative byte count
    fn advance(&mut self, received: u64);

    /// Called each time the received byte count doubles
    fn mark(&mut self, _received: u64) {}

    /// Called once the file is in place
    fn finish(&mut self, _received: u64) {}
}

/// Progress sink that discards everything
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn advance(&mut self, _received: u64) {}
}

/// Streams artifacts to local files
pub struct Downloader<'a> {
    client: &'a ServiceClient,
}

impl<'a> Downloader<'a> {
    pub fn new(client: &'a ServiceClient) -> Self {
        Self { client }
    }

    /// Download `target` to `destination`, returning the bytes written
    pub fn download(
        &self,
        session: &Session,
        target: &ResolvedTarget,
        destination: &Path,
        progress: &mut dyn ProgressSink,
    ) -> OlResult<u64> {
        info!("Downloading {} to {}", target.kind, destination.display());
        let response = self
            .client
            .get(&target.url, Some(session))
            .map_err(|e| OlError::Download(e.to_string()))?;

        if !response.is_success() {
            return Err(OlError::Download(format!(
                "status {} from {}",
                response.status(),
                target.url
            )));
        }

        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| OlError::io(format!("creating {}", parent.display()), e))?;
            }
        }

        let part = part_path(destination);
        progress.begin(response.content_length());
        let streamed = stream_to(response.into_reader(), &part, progress)
            .and_then(|written| fs::rename(&part, destination).map(|()| written));

        match streamed {
            Ok(written) => {
                progress.finish(written);
                debug!("Wrote {} bytes to {}", written, destination.display());
                Ok(written)
            }
            Err(e) => {
                let _ = fs::remove_file(&part);
                Err(OlError::Download(format!(
                    "writing {}: {}",
                    destination.display(),
                    e
                )))
            }
        }
    }
}

fn stream_to(
    mut reader: Box<dyn Read>,
    path: &Path,
    progress: &mut dyn ProgressSink,
) -> std::io::Result<u64> {
    let mut file = File::create(path)?;
    let mut buf = [0u8; CHUNK_SIZE];
    let mut received: u64 = 0;
    let mut marks = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        file.write_all(&buf[..n])?;
        received += n as u64;
        progress.advance(received);

        let now = progress_marks(received);
        while marks < now {
            marks += 1;
            progress.mark(received);
        }
    }

    file.sync_all()?;
    Ok(received)
}

/// `<destination>.part`
fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    destination.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::*;
    use crate::client::{Request, Response, Transport};
    use std::io;
    use tempfile::TempDir;

    fn outputs() -> OutputSet {
        [
            ("pdf", "/project/P1/build/abc/output/output.pdf"),
            ("log", "/project/P1/build/abc/output/output.log"),
        ]
        .into_iter()
        .collect()
    }

    #[derive(Default)]
    struct Recorder {
        total: Option<u64>,
        advances: Vec<u64>,
        marks: usize,
        finished: Option<u64>,
    }

    impl ProgressSink for Recorder {
        fn begin(&mut self, total: Option<u64>) {
            self.total = total;
        }
        fn advance(&mut self, received: u64) {
            self.advances.push(received);
        }
        fn mark(&mut self, _received: u64) {
            self.marks += 1;
        }
        fn finish(&mut self, received: u64) {
            self.finished = Some(received);
        }
    }

    #[test]
    fn zip_resolves_to_archive_endpoint() {
        let (client, _log) = scripted_client(vec![]);
        let target = resolve_target(&client, "zip", Some("P1"), None).unwrap();
        assert_eq!(target.url, "https://ol.test/project/P1/download/zip");
        assert_eq!(target.kind, "zip");
        assert_eq!(target.default_file_name(Some("P1")), "P1.zip");
    }

    #[test]
    fn zip_requires_project() {
        let (client, _log) = scripted_client(vec![]);
        let err = resolve_target(&client, "zip", None, None).unwrap_err();
        assert!(matches!(err, OlError::User(_)));
    }

    #[test]
    fn absolute_locator_takes_suffix() {
        let (client, _log) = scripted_client(vec![]);
        let target = resolve_target(
            &client,
            "https://ol.test/project/P1/build/abc/output/output.bbl?compileGroup=standard",
            None,
            None,
        )
        .unwrap();
        assert_eq!(target.kind, "bbl");
        assert_eq!(target.default_file_name(None), "output.bbl");
        assert!(target.url.ends_with("?compileGroup=standard"));
    }

    #[test]
    fn locator_without_suffix_is_bin() {
        let (client, _log) = scripted_client(vec![]);
        for locator in [
            "https://ol.test/project/P1/output/blob",
            "https://ol.test/",
            "https://files.example.org/x/.hidden",
            "https://example.org.test",
        ] {
            let target = resolve_target(&client, locator, None, None).unwrap();
            assert_eq!(target.kind, "bin", "{}", locator);
        }
    }

    #[test]
    fn artifact_type_uses_outputs() {
        let (client, _log) = scripted_client(vec![]);
        let outputs = outputs();
        let target = resolve_target(&client, "log", Some("P1"), Some(&outputs)).unwrap();
        assert_eq!(
            target.url,
            "https://ol.test/project/P1/build/abc/output/output.log"
        );
        assert_eq!(target.default_file_name(Some("P1")), "output.log");
    }

    #[test]
    fn unknown_artifact_lists_available() {
        let (client, _log) = scripted_client(vec![]);
        let outputs = outputs();
        let err = resolve_target(&client, "synctex", Some("P1"), Some(&outputs)).unwrap_err();
        match err {
            OlError::UnknownArtifact { kind, available } => {
                assert_eq!(kind, "synctex");
                assert_eq!(available, "log, pdf");
            }
            other => panic!("expected UnknownArtifact, got {other:?}"),
        }

        let err = resolve_target(&client, "pdf", Some("P1"), None).unwrap_err();
        assert!(matches!(err, OlError::UnknownArtifact { ref available, .. } if available == "none"));
    }

    #[test]
    fn marks_double() {
        assert_eq!(progress_marks(0), 0);
        assert_eq!(progress_marks(8191), 0);
        assert_eq!(progress_marks(8192), 1);
        assert_eq!(progress_marks(16383), 1);
        assert_eq!(progress_marks(16384), 2);
        assert_eq!(progress_marks(32768), 3);
        assert_eq!(progress_marks(8192 * 1024), 11);
    }

    #[test]
    fn download_writes_file_with_progress() {
        let temp = TempDir::new().unwrap();
        let body = vec![7u8; 40_000];
        let (client, log) = scripted_client(vec![
            Reply::bytes(200, body.clone()).with_header("Content-Length", "40000")
        ]);
        let target = resolve_target(&client, "zip", Some("P1"), None).unwrap();
        let dest = temp.path().join("out").join("P1.zip");
        let mut recorder = Recorder::default();

        let written = Downloader::new(&client)
            .download(&valid_session(), &target, &dest, &mut recorder)
            .unwrap();

        assert_eq!(written, 40_000);
        assert_eq!(fs::read(&dest).unwrap(), body);
        assert!(!part_path(&dest).exists());
        assert_eq!(recorder.total, Some(40_000));
        assert_eq!(recorder.advances.last(), Some(&40_000));
        assert_eq!(recorder.marks, progress_marks(40_000) as usize);
        assert_eq!(recorder.finished, Some(40_000));

        let log = log.borrow();
        assert_eq!(log[0].url, "https://ol.test/project/P1/download/zip");
        assert!(log[0].header_value("cookie").is_some());
    }

    #[test]
    fn failed_status_creates_no_file() {
        let temp = TempDir::new().unwrap();
        let (client, _log) = scripted_client(vec![Reply::status(404, "not found")]);
        let target = resolve_target(&client, "https://ol.test/x/output.pdf", None, None).unwrap();
        let dest = temp.path().join("output.pdf");

        let err = Downloader::new(&client)
            .download(&valid_session(), &target, &dest, &mut NoProgress)
            .unwrap_err();

        assert!(matches!(err, OlError::Download(ref m) if m.contains("404")));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    struct BrokenReader {
        sent: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.sent {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            self.sent = true;
            let n = buf.len().min(100);
            buf[..n].fill(1);
            Ok(n)
        }
    }

    struct BrokenTransport;

    impl Transport for BrokenTransport {
        fn send(&self, _request: Request) -> OlResult<Response> {
            Ok(Response::new(
                200,
                vec![],
                Box::new(BrokenReader { sent: false }),
            ))
        }
    }

    #[test]
    fn interrupted_stream_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        let client =
            ServiceClient::with_transport(&test_config(), Box::new(BrokenTransport)).unwrap();
        let target = resolve_target(&client, "https://ol.test/x/output.pdf", None, None).unwrap();
        let dest = temp.path().join("output.pdf");

        let err = Downloader::new(&client)
            .download(&valid_session(), &target, &dest, &mut NoProgress)
            .unwrap_err();

        assert!(matches!(err, OlError::Download(_)));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/tmp/out/output.pdf")),
            PathBuf::from("/tmp/out/output.pdf.part")
        );
    }
}
