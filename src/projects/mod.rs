//! Project and document listing

pub mod realtime;

use crate::client::{scrape, Request, ServiceClient};
use crate::config::Config;
use crate::error::{OlError, OlResult};
use crate::session::Session;
use chrono::Utc;
use realtime::{RealtimeConnector, TungsteniteConnector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Project summary from the project list page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    #[serde(alias = "_id")]
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub trashed: bool,

    #[serde(default)]
    pub archived: bool,
}

/// Editable document inside a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub id: String,
    pub name: String,
    /// Path relative to the project root, including the name
    pub path: String,
}

#[derive(Debug, Deserialize)]
struct ProjectTree {
    #[serde(rename = "rootFolder", default)]
    root_folder: Vec<Folder>,
}

#[derive(Debug, Deserialize)]
struct Folder {
    #[serde(default)]
    name: String,
    #[serde(default)]
    docs: Vec<DocEntry>,
    #[serde(default)]
    folders: Vec<Folder>,
}

#[derive(Debug, Deserialize)]
struct DocEntry {
    #[serde(rename = "_id")]
    id: String,
    name: String,
}

/// Reads project metadata for an authenticated session
pub struct Lister<'a> {
    client: &'a ServiceClient,
    connector: Box<dyn RealtimeConnector>,
    socket_timeout: Duration,
}

impl<'a> Lister<'a> {
    pub fn new(client: &'a ServiceClient, config: &Config) -> Self {
        Self::with_connector(client, config, Box::new(TungsteniteConnector))
    }

    pub fn with_connector(
        client: &'a ServiceClient,
        config: &Config,
        connector: Box<dyn RealtimeConnector>,
    ) -> Self {
        Self {
            client,
            connector,
            socket_timeout: config.http.socket_timeout(),
        }
    }

    /// List the user's projects
    pub fn list_projects(&self, session: &Session) -> OlResult<Vec<ProjectInfo>> {
        let url = self.client.url("/project");
        let response = self.client.get(&url, Some(session))?;

        if response.is_auth_failure() {
            return Err(OlError::SessionExpired(format!(
                "status {} from {}",
                response.status(),
                url
            )));
        }
        if !response.is_success() {
            return Err(OlError::unexpected(
                &url,
                format!("status {}", response.status()),
            ));
        }

        let html = response
            .into_text()
            .map_err(|e| OlError::http(&url, e))?;

        match parse_project_list(&html) {
            Some(projects) => {
                info!("Found {} project(s)", projects.len());
                Ok(projects)
            }
            None if scrape::looks_like_login_page(&html) => Err(OlError::SessionExpired(
                "project page shows the login form".into(),
            )),
            None => Err(OlError::unexpected(&url, "no project list in page")),
        }
    }

    /// List the documents of a project via the real-time channel
    pub fn list_documents(&self, session: &Session, project_id: &str) -> OlResult<Vec<DocumentInfo>> {
        let url = self.client.url(&format!(
            "/socket.io/1/?t={}&projectId={}",
            Utc::now().timestamp_millis(),
            project_id
        ));
        let request = Request::get(&url).timeout(self.socket_timeout);
        let response = self
            .client
            .send(request, Some(session))
            .map_err(|e| OlError::Protocol(format!("handshake request failed: {}", e)))?;

        if response.is_auth_failure() {
            return Err(OlError::SessionExpired(format!(
                "status {} from real-time handshake",
                response.status()
            )));
        }
        if !response.is_success() {
            return Err(OlError::Protocol(format!(
                "handshake returned status {}",
                response.status()
            )));
        }

        let body = response
            .into_text()
            .map_err(|e| OlError::Protocol(format!("reading handshake reply: {}", e)))?;
        let sid = realtime::parse_handshake(&body)?;
        let socket_url = realtime::websocket_url(self.client.base_url(), &sid)?;
        debug!("Real-time handshake complete");

        let cookies = session.cookie_header(&socket_url, Utc::now());
        let mut channel = self.connector.connect(
            &socket_url,
            cookies.as_deref(),
            self.client.user_agent(),
            self.socket_timeout,
        )?;
        let result = realtime::join_project(channel.as_mut(), project_id);
        channel.close();
        let reply = result?;

        if let Some(error) = reply.error {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(if message.to_lowercase().contains("not authorized") {
                OlError::SessionExpired(message)
            } else {
                OlError::Protocol(format!("joinProject failed: {}", message))
            });
        }

        flatten_tree(reply.project)
    }
}

/// Extract the project list embedded in the project page
pub fn parse_project_list(html: &str) -> Option<Vec<ProjectInfo>> {
    let payload = scrape::meta_content(html, "ol-prefetchedProjectsBlob")
        .or_else(|| scrape::meta_content(html, "ol-projects"))
        .or_else(|| scrape::script_body(html, "data"))?;

    let value: Value = serde_json::from_str(&payload).ok()?;
    let list = match value {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => map.remove("projects")?,
        _ => return None,
    };
    serde_json::from_value(list).ok()
}

/// Flatten the project's folder tree into documents with paths
fn flatten_tree(project: Value) -> OlResult<Vec<DocumentInfo>> {
    let tree: ProjectTree = serde_json::from_value(project)
        .map_err(|e| OlError::Protocol(format!("malformed project tree: {}", e)))?;

    let mut documents = vec![];
    for root in &tree.root_folder {
        // The root folder's own name is not part of document paths
        collect_docs(root, "", &mut documents);
    }
    Ok(documents)
}

fn collect_docs(folder: &Folder, prefix: &str, out: &mut Vec<DocumentInfo>) {
    for doc in &folder.docs {
        out.push(DocumentInfo {
            id: doc.id.clone(),
            name: doc.name.clone(),
            path: format!("{}{}", prefix, doc.name),
        });
    }
    for sub in &folder.folders {
        collect_docs(sub, &format!("{}{}/", prefix, sub.name), out);
    }
}

/// Accept a bare project id or a project URL (`.../project/<id>[/...]`)
pub fn parse_project_ref(input: &str) -> OlResult<String> {
    let input = input.trim();
    if crate::client::is_absolute_url(input) {
        let path = input
            .split_once("://")
            .and_then(|(_, rest)| rest.split_once('/'))
            .map(|(_, path)| path)
            .unwrap_or_default();
        let mut segments = path.split(['/', '?', '#']);
        while let Some(segment) = segments.next() {
            if segment == "project" {
                if let Some(id) = segments.next().filter(|id| !id.is_empty()) {
                    return Ok(id.to_string());
                }
            }
        }
        return Err(OlError::User(format!(
            "Could not find a project id in URL: {}",
            input
        )));
    }

    if input.is_empty() || input.contains(['/', '?', '#', ' ']) {
        return Err(OlError::User(format!("Invalid project id: '{}'", input)));
    }
    Ok(input.to_string())
}
