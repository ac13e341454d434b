//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use failover_control::config::{FailoverConfig, Strategy};
use failover_control::{CallbackError, FailoverRegistry, Instance, RecoveryProbe};

/// Probe whose answer is scripted per instance id.
#[derive(Default)]
pub struct ScriptedProbe {
    unhealthy: Mutex<HashSet<String>>,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    pub fn set_healthy(&self, id: &str, healthy: bool) {
        let mut unhealthy = self.unhealthy.lock();
        if healthy {
            unhealthy.remove(id);
        } else {
            unhealthy.insert(id.to_string());
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecoveryProbe for ScriptedProbe {
    async fn probe(&self, instance: &Instance) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        !self.unhealthy.lock().contains(&instance.id)
    }
}

/// Records every callback invocation as `"failed->replacement"`.
#[derive(Clone, Default)]
pub struct CallbackRecorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallbackRecorder {
    pub fn register(&self, registry: &FailoverRegistry, service: &str) {
        let calls = self.calls.clone();
        registry.register_callback(service, move |failed: &Instance, replacement: &Instance| -> Result<(), CallbackError> {
            calls.lock().push(format!("{}->{}", failed.id, replacement.id));
            Ok(())
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

pub fn config(strategy: Strategy) -> FailoverConfig {
    FailoverConfig {
        strategy,
        recovery_timeout_secs: 60,
        ..FailoverConfig::default()
    }
}

pub fn registry_with(config: FailoverConfig) -> (FailoverRegistry, Arc<ScriptedProbe>) {
    let probe = Arc::new(ScriptedProbe::default());
    let registry = FailoverRegistry::new(config, probe.clone());
    (registry, probe)
}

pub fn instances(ids: &[&str]) -> Vec<Instance> {
    ids.iter()
        .enumerate()
        .map(|(i, id)| Instance::new(*id, "10.0.0.1", 8000 + i as u16))
        .collect()
}

/// Start a programmable HTTP backend on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = u16> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let status = f().await;
                let status_text = match status {
                    200 => "200 OK",
                    503 => "503 Service Unavailable",
                    _ => "500 Internal Server Error",
                };
                let response = format!("HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n", status_text);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}
