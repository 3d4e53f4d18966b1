//! Remote parameter store client.
//!
//! Speaks the SSM `GetParameter` JSON protocol against a configurable
//! endpoint: one `POST /` per lookup with the `X-Amz-Target` header and
//! `{"Name": ..., "WithDecryption": true}` as the body. Request signing is
//! the deployment's concern (task-role credential proxy or a compatible
//! local endpoint); this client only does the round trip and reacts to the
//! result. Lookups are never retried — an absent parameter or denied access
//! fails the run.

use crate::command::Command;
use crate::error::{MangoError, Result};
use serde::Deserialize;
use std::time::Duration;

const GET_PARAMETER_TARGET: &str = "AmazonSSM.GetParameter";

#[derive(Debug, Deserialize)]
struct GetParameterResponse {
    #[serde(rename = "Parameter")]
    parameter: Parameter,
}

#[derive(Debug, Deserialize)]
struct Parameter {
    #[serde(rename = "Value")]
    value: String,
}

pub struct ParameterStore {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl ParameterStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    /// Fetch one parameter with server-side decryption. Single round trip.
    pub fn fetch(&self, name: &str) -> Result<String> {
        tracing::debug!(name, "fetching parameter");
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", GET_PARAMETER_TARGET)
            .header("Content-Type", "application/x-amz-json-1.1")
            .json(&serde_json::json!({ "Name": name, "WithDecryption": true }))
            .send()
            .map_err(|e| MangoError::ParameterStore {
                name: name.to_string(),
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(MangoError::ParameterStore {
                name: name.to_string(),
                detail: format!("{status}: {body}"),
            });
        }

        let parsed: GetParameterResponse =
            response.json().map_err(|e| MangoError::ParameterStore {
                name: name.to_string(),
                detail: format!("malformed response: {e}"),
            })?;
        Ok(parsed.parameter.value)
    }

    /// Read the pending job command from the named parameter.
    pub fn fetch_command(&self, name: &str) -> Result<Command> {
        self.fetch(name)?.trim().parse()
    }
}
