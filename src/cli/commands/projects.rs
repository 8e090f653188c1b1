//! Projects command - list the user's projects

use super::{forget_rejected, open_session, print_json};
use crate::cli::args::{OutputFormat, ProjectsArgs};
use crate::client::ServiceClient;
use crate::config::{Config, ConfigManager};
use crate::error::OlResult;
use crate::projects::{Lister, ProjectInfo};
use crate::session::SessionManager;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the projects command
pub fn execute(args: ProjectsArgs, config: &Config) -> OlResult<()> {
    let ctx = UiContext::detect();
    let state_dir = ConfigManager::ensure_state_dir(config)?;
    let client = ServiceClient::new(config)?;
    let manager = SessionManager::new(config, &client, &state_dir);

    let session = open_session(&ctx, &manager)?;
    let projects = forget_rejected(
        &manager,
        Lister::new(&client, config).list_projects(&session),
    )?;
    let projects = visible(projects, args.all);

    if projects.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => ui::step_info(&ctx, "No projects"),
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&projects),
        OutputFormat::Json => print_json(&projects)?,
        OutputFormat::Plain => {
            for project in &projects {
                println!("{}\t{}", project.id, project.name);
            }
        }
    }

    Ok(())
}

/// Trashed and archived projects are hidden unless `all` is set
fn visible(projects: Vec<ProjectInfo>, all: bool) -> Vec<ProjectInfo> {
    if all {
        return projects;
    }
    projects
        .into_iter()
        .filter(|p| !p.trashed && !p.archived)
        .collect()
}

fn print_table(projects: &[ProjectInfo]) {
    println!(
        "{:<26} {:<10} {}",
        style("ID").bold(),
        style("STATE").bold(),
        style("NAME").bold()
    );
    println!("{}", "-".repeat(72));

    for project in projects {
        let state = if project.trashed {
            style("trashed").red()
        } else if project.archived {
            style("archived").dim()
        } else {
            style("active").green()
        };
        println!("{:<26} {:<10} {}", project.id, state, project.name);
    }

    println!();
    println!("{} project(s)", projects.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(id: &str, trashed: bool, archived: bool) -> ProjectInfo {
        ProjectInfo {
            id: id.to_string(),
            name: format!("Project {}", id),
            trashed,
            archived,
        }
    }

    #[test]
    fn hides_trashed_and_archived_by_default() {
        let projects = vec![
            project("a", false, false),
            project("b", true, false),
            project("c", false, true),
        ];

        let shown = visible(projects.clone(), false);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].id, "a");

        assert_eq!(visible(projects, true).len(), 3);
    }
}
