//! ureq-backed transport

use super::{Body, Method, Request, Response, Transport};
use crate::error::{OlError, OlResult};
use std::time::Duration;
use ureq::Agent;

/// Blocking HTTP transport built on ureq.
///
/// Status codes are never turned into errors and redirects are not
/// followed; callers inspect the response themselves.
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self {
            agent: Self::agent(None),
        }
    }

    fn agent(timeout: Option<Duration>) -> Agent {
        let config = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(timeout)
            .build();
        Agent::new_with_config(config)
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: Request) -> OlResult<Response> {
        let bounded;
        let agent = match request.timeout {
            Some(timeout) => {
                bounded = Self::agent(Some(timeout));
                &bounded
            }
            None => &self.agent,
        };

        let url = request.url.as_str();
        let result = match request.method {
            Method::Get => {
                let mut builder = agent.get(url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            Method::Post => {
                let mut builder = agent.post(url);
                for (name, value) in &request.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &request.body {
                    Body::Empty => builder.send_empty(),
                    Body::Form(fields) => {
                        builder.send_form(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                    }
                    Body::Json(value) => {
                        let payload = serde_json::to_vec(value)?;
                        builder
                            .header("Content-Type", "application/json")
                            .send(payload.as_slice())
                    }
                }
            }
        };

        let response = result.map_err(|e| OlError::http(url, e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.into_body().into_reader();

        Ok(Response::new(status, headers, Box::new(body)))
    }
}
