//! Docs command - list the documents of a project

use super::{forget_rejected, open_session, print_json};
use crate::cli::args::{DocsArgs, OutputFormat};
use crate::client::ServiceClient;
use crate::config::{Config, ConfigManager};
use crate::error::OlResult;
use crate::projects::{parse_project_ref, DocumentInfo, Lister};
use crate::session::SessionManager;
use crate::ui::{self, TaskSpinner, UiContext};
use console::style;

/// Execute the docs command
pub fn execute(args: DocsArgs, config: &Config) -> OlResult<()> {
    let ctx = UiContext::detect();
    let project_id = parse_project_ref(&args.project)?;
    let state_dir = ConfigManager::ensure_state_dir(config)?;
    let client = ServiceClient::new(config)?;
    let manager = SessionManager::new(config, &client, &state_dir);

    let session = open_session(&ctx, &manager)?;

    let mut spinner = TaskSpinner::new(&ctx);
    let fancy = matches!(args.format, OutputFormat::Table);
    if fancy {
        spinner.start("Joining project...");
    }
    let result = Lister::new(&client, config).list_documents(&session, &project_id);
    let documents = match forget_rejected(&manager, result) {
        Ok(documents) => {
            if fancy {
                spinner.stop(&format!("Project {}", project_id));
            }
            documents
        }
        Err(e) => {
            if fancy {
                spinner.stop_error("Could not read the project tree");
            }
            return Err(e);
        }
    };

    if documents.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&ctx, "No documents"),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&documents),
        OutputFormat::Json => print_json(&documents)?,
        OutputFormat::Plain => {
            for doc in &documents {
                println!("{}\t{}", doc.id, doc.path);
            }
        }
    }

    Ok(())
}

fn print_table(documents: &[DocumentInfo]) {
    println!("{:<26} {}", style("ID").bold(), style("PATH").bold());
    println!("{}", "-".repeat(72));
    for doc in documents {
        println!("{:<26} {}", doc.id, doc.path);
    }
    println!();
    println!("{} document(s)", documents.len());
}
