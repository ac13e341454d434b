//! HTTP health probe.
//!
//! Issues `GET http://{host}:{port}{path}`; any 2xx within the timeout is
//! healthy. Used both by the health monitor and as the recovery probe.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::failover::RecoveryProbe;
use crate::load_balancer::instance::Instance;

pub struct HttpProbe {
    client: Client<HttpConnector, Body>,
    path: String,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(config: &HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            client,
            path: config.path.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn url(&self, instance: &Instance) -> String {
        format!("http://{}{}", instance.address(), self.path)
    }
}

#[async_trait]
impl RecoveryProbe for HttpProbe {
    async fn probe(&self, instance: &Instance) -> bool {
        let request = match Request::builder()
            .method("GET")
            .uri(self.url(instance))
            .header("user-agent", "failover-control-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(instance = %instance.id, error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(
                        instance = %instance.id,
                        address = %instance.address(),
                        status = %response.status(),
                        "Health check failed: non-success status"
                    );
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(instance = %instance.id, address = %instance.address(), error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(instance = %instance.id, address = %instance.address(), "Health check failed: timeout");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_url() {
        let probe = HttpProbe::new(&HealthCheckConfig {
            path: "/ready".to_string(),
            ..HealthCheckConfig::default()
        });
        let instance = Instance::new("a", "10.0.0.7", 8080);
        assert_eq!(probe.url(&instance), "http://10.0.0.7:8080/ready");
    }

    #[tokio::test]
    async fn test_probe_unreachable_is_unhealthy() {
        let probe = HttpProbe::new(&HealthCheckConfig {
            timeout_secs: 1,
            ..HealthCheckConfig::default()
        });
        // port 1 on loopback refuses connections
        let instance = Instance::new("a", "127.0.0.1", 1);
        assert!(!probe.probe(&instance).await);
    }
}
