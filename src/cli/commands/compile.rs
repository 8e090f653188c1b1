//! Compile command - compile on the server, then download the result

use super::download::{destination, fetch};
use super::{forget_rejected, open_session};
use crate::cli::args::CompileArgs;
use crate::client::ServiceClient;
use crate::compile::{CompileCache, Compiler, OutputSet};
use crate::config::{Config, ConfigManager};
use crate::download::resolve_target;
use crate::error::OlResult;
use crate::projects::parse_project_ref;
use crate::session::SessionManager;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the compile command
pub fn execute(args: CompileArgs, config: &Config) -> OlResult<()> {
    let ctx = UiContext::detect();
    let project_id = parse_project_ref(&args.project)?;
    let document_id = args.doc.unwrap_or_default();
    let state_dir = ConfigManager::ensure_state_dir(config)?;
    let client = ServiceClient::new(config)?;
    let manager = SessionManager::new(config, &client, &state_dir);

    let session = open_session(&ctx, &manager)?;
    let cache = CompileCache::open(&state_dir, config.cache.max_entries)?;
    let mut compiler = Compiler::new(&client, cache, config);

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Compiling {}...", project_id));
    let result = compiler.compile(&session, &project_id, &document_id, args.force);
    let outputs = match forget_rejected(&manager, result) {
        Ok(outputs) => {
            spinner.stop(&format!("Compiled ({})", summary(&outputs)));
            outputs
        }
        Err(e) => {
            spinner.stop_error("Compile failed");
            return Err(e);
        }
    };

    if args.no_download {
        for (kind, locator) in outputs.iter() {
            ui::key_value(&ctx, kind, &client.url(locator));
        }
        return Ok(());
    }

    let target = resolve_target(&client, &args.target, Some(&project_id), Some(&outputs))?;
    let dest = destination(args.output, config, &target, Some(&project_id));
    fetch(&ctx, &client, &session, &target, &dest)?;

    Ok(())
}

fn summary(outputs: &OutputSet) -> String {
    if outputs.is_empty() {
        "no outputs".to_string()
    } else {
        outputs.kinds().collect::<Vec<_>>().join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_kinds() {
        let outputs: OutputSet = [("pdf", "/a.pdf"), ("log", "/a.log")].into_iter().collect();
        assert_eq!(summary(&outputs), "log, pdf");
        assert_eq!(summary(&OutputSet::new()), "no outputs");
    }
}
