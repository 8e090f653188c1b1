//! Server-side compilation with result caching

use super::cache::{CacheEntry, CompileCache, OutputSet};
use crate::client::{Body, Request, ServiceClient};
use crate::config::Config;
use crate::error::{OlError, OlResult};
use crate::session::Session;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info};

/// Compile endpoint reply
#[derive(Debug, Deserialize)]
struct CompileReply {
    status: String,
    #[serde(rename = "outputFiles", default)]
    output_files: Vec<OutputFile>,
}

#[derive(Debug, Deserialize)]
struct OutputFile {
    #[serde(rename = "type")]
    kind: String,
    url: String,
}

/// Triggers compiles and keeps the compile cache current
pub struct Compiler<'a> {
    client: &'a ServiceClient,
    cache: CompileCache,
    ttl: Duration,
}

impl<'a> Compiler<'a> {
    pub fn new(client: &'a ServiceClient, cache: CompileCache, config: &Config) -> Self {
        let ttl = i64::try_from(config.cache.ttl_secs).unwrap_or(i64::MAX);
        Self {
            client,
            cache,
            ttl: Duration::try_seconds(ttl).unwrap_or(Duration::MAX),
        }
    }

    pub fn cache(&self) -> &CompileCache {
        &self.cache
    }

    /// Compile a document, reusing a fresh cached result unless `force` is set.
    ///
    /// `document_id` may be empty to compile the project's main document.
    pub fn compile(
        &mut self,
        session: &Session,
        project_id: &str,
        document_id: &str,
        force: bool,
    ) -> OlResult<OutputSet> {
        let key = CompileCache::key(project_id, document_id);

        if !force {
            if let Some(entry) = self.cache.fresh(&key, Utc::now()) {
                info!("Using cached compile result for {}", key);
                return Ok(entry.outputs.clone());
            }
        }

        let outputs = self.request_compile(session, project_id, document_id)?;

        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.cache
            .insert(key.clone(), CacheEntry::new(outputs.clone(), expires_at));
        self.cache.save()?;
        debug!("Cached compile result for {} until {}", key, expires_at);

        Ok(outputs)
    }

    fn request_compile(
        &self,
        session: &Session,
        project_id: &str,
        document_id: &str,
    ) -> OlResult<OutputSet> {
        let url = self.client.url(&format!("/project/{}/compile", project_id));
        let root_doc = if document_id.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::Value::from(document_id)
        };
        let body = Body::Json(serde_json::json!({
            "rootDoc_id": root_doc,
            "draft": false,
            "check": "silent",
            "incrementalCompilesEnabled": true,
            "_csrf": session.csrf_token(),
        }));
        let request = Request::post(&url, body).header("X-Csrf-Token", session.csrf_token());

        info!("Compiling project {}", project_id);
        let response = self
            .client
            .send(request, Some(session))
            .map_err(|e| OlError::Compile(e.to_string()))?;
        if response.is_auth_failure() {
            return Err(OlError::CompileUnauthorized {
                status: response.status(),
                url,
            });
        }
        if !response.is_success() {
            return Err(OlError::Compile(format!(
                "status {} from {}",
                response.status(),
                url
            )));
        }

        let body = response
            .into_text()
            .map_err(|e| OlError::Compile(format!("reading compile reply: {}", e)))?;
        let reply: CompileReply = serde_json::from_str(&body)
            .map_err(|e| OlError::Compile(format!("malformed compile reply: {}", e)))?;

        if reply.status != "success" {
            return Err(OlError::Compile(format!(
                "compile finished with status '{}'",
                reply.status
            )));
        }

        Ok(reply
            .output_files
            .into_iter()
            .map(|file| (file.kind, file.url))
            .collect())
    }
}
