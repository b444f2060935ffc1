use super::{Operation, Transport};
use crate::error::{ClientError, Result};
use std::time::Duration;
use ureq::Agent;

/// JSON over HTTP: each operation is a `POST` to `<base_url>/<operation>`.
pub struct HttpTransport {
    agent: Agent,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: config.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self, operation: Operation) -> String {
        format!("{}/{}", self.base_url, operation.as_str())
    }
}

impl Transport for HttpTransport {
    fn call(&self, operation: Operation, request: &serde_json::Value) -> Result<serde_json::Value> {
        let url = self.endpoint(operation);
        let mut response = self
            .agent
            .post(&url)
            .header("Accept", "application/json")
            .send_json(request)
            .map_err(|err| ClientError::Backend(format!("POST {url}: {err}")))?;
        response
            .body_mut()
            .read_json::<serde_json::Value>()
            .map_err(|err| ClientError::Backend(format!("read response from {url}: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_base_url_and_operation() {
        let transport = HttpTransport::new("https://compiler.example/api/", Duration::from_secs(5));
        assert_eq!(
            transport.endpoint(Operation::UpdateUnsafe),
            "https://compiler.example/api/update_unsafe"
        );
        assert_eq!(
            transport.endpoint(Operation::DescribeDeployment),
            "https://compiler.example/api/describe_deployment"
        );
    }
}
