//! Download command - fetch a compile output, a URL or the project archive

use super::open_session;
use crate::cli::args::DownloadArgs;
use crate::client::{is_absolute_url, ServiceClient};
use crate::compile::CompileCache;
use crate::config::{Config, ConfigManager};
use crate::download::{resolve_target, Downloader, ResolvedTarget, ARCHIVE};
use crate::error::{OlError, OlResult};
use crate::projects::parse_project_ref;
use crate::session::{Session, SessionManager};
use crate::ui::{self, DownloadProgress, UiContext};
use chrono::Utc;
use indicatif::HumanBytes;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Execute the download command
pub fn execute(args: DownloadArgs, config: &Config) -> OlResult<()> {
    let ctx = UiContext::detect();
    let project_id = args.project.as_deref().map(parse_project_ref).transpose()?;
    let document_id = args.doc.unwrap_or_default();
    let client = ServiceClient::new(config)?;

    let needs_outputs = !is_absolute_url(&args.target) && args.target != ARCHIVE;
    let outputs = match (&project_id, needs_outputs) {
        (Some(project_id), true) => {
            let cache = CompileCache::open(
                &ConfigManager::state_dir(config),
                config.cache.max_entries,
            )?;
            let key = CompileCache::key(project_id, &document_id);
            let entry = cache.get(&key).cloned();
            match &entry {
                Some(entry) if !entry.is_fresh(Utc::now()) => ui::step_warn_hint(
                    &ctx,
                    "Compile result is older than the cache lifetime",
                    "the file may no longer exist; compile again if the download fails",
                ),
                Some(_) => debug!("Using cached outputs for {}", key),
                None => debug!("No cached outputs for {}", key),
            }
            entry.map(|e| e.outputs)
        }
        (None, true) => {
            return Err(OlError::User(format!(
                "Downloading '{}' requires --project",
                args.target
            )))
        }
        (_, false) => None,
    };

    let target = resolve_target(
        &client,
        &args.target,
        project_id.as_deref(),
        outputs.as_ref(),
    )?;
    let dest = destination(args.output, config, &target, project_id.as_deref());

    let state_dir = ConfigManager::ensure_state_dir(config)?;
    let manager = SessionManager::new(config, &client, &state_dir);
    let session = open_session(&ctx, &manager)?;

    fetch(&ctx, &client, &session, &target, &dest)?;
    Ok(())
}

/// Where a target is written: `--output` (a file, or a directory to put the
/// default name in), else the configured output directory
pub(crate) fn destination(
    output: Option<PathBuf>,
    config: &Config,
    target: &ResolvedTarget,
    project_id: Option<&str>,
) -> PathBuf {
    let file_name = target.default_file_name(project_id);
    match output {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path,
        None => config.download.output_dir.join(file_name),
    }
}

/// Stream a resolved target to disk with progress output
pub(crate) fn fetch(
    ctx: &UiContext,
    client: &ServiceClient,
    session: &Session,
    target: &ResolvedTarget,
    dest: &Path,
) -> OlResult<u64> {
    let label = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.kind.clone());
    let mut progress = DownloadProgress::new(ctx, &label);

    let written = Downloader::new(client).download(session, target, dest, &mut progress)?;
    ui::step_ok_detail(
        ctx,
        &format!("Saved {}", dest.display()),
        &HumanBytes(written).to_string(),
    );
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn target(kind: &str) -> ResolvedTarget {
        ResolvedTarget {
            url: format!("https://ol.test/out.{}", kind),
            kind: kind.to_string(),
        }
    }

    #[test]
    fn destination_defaults_to_output_dir() {
        let mut config = Config::default();
        config.download.output_dir = PathBuf::from("/tmp/papers");

        assert_eq!(
            destination(None, &config, &target("pdf"), Some("P1")),
            PathBuf::from("/tmp/papers/output.pdf")
        );
        assert_eq!(
            destination(None, &config, &target("zip"), Some("P1")),
            PathBuf::from("/tmp/papers/P1.zip")
        );
    }

    #[test]
    fn destination_inside_existing_directory() {
        let temp = TempDir::new().unwrap();
        let config = Config::default();

        assert_eq!(
            destination(Some(temp.path().to_path_buf()), &config, &target("log"), None),
            temp.path().join("output.log")
        );
        assert_eq!(
            destination(Some(temp.path().join("paper.pdf")), &config, &target("pdf"), None),
            temp.path().join("paper.pdf")
        );
    }
}
