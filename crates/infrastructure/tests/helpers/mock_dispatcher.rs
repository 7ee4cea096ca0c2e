#![allow(dead_code)]
use async_trait::async_trait;
use dnsbatch_domain::{DomainError, RecordType};
use dnsbatch_infrastructure::dns::QueryDispatcher;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub server: IpAddr,
    pub name: String,
    pub record_type: RecordType,
    pub at: Instant,
}

/// In-memory dispatcher answering `<type> for <name>` and recording every
/// call. Names can be scripted to fail a number of times first.
#[derive(Default)]
pub struct MockDispatcher {
    calls: Mutex<Vec<DispatchCall>>,
    failures: Mutex<HashMap<String, u32>>,
    empty: Mutex<Vec<String>>,
    latency: Duration,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The next `times` dispatches for `name` time out.
    pub fn fail(self, name: &str, times: u32) -> Self {
        self.failures.lock().unwrap().insert(name.to_string(), times);
        self
    }

    /// Dispatches for `name` succeed with no records.
    pub fn empty(self, name: &str) -> Self {
        self.empty.lock().unwrap().push(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<DispatchCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, name: &str) -> Vec<DispatchCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.name == name)
            .collect()
    }

    pub fn answer(name: &str, record_type: RecordType) -> String {
        format!("{} for {}", record_type, name)
    }
}

#[async_trait]
impl QueryDispatcher for MockDispatcher {
    async fn dispatch(
        &self,
        server: IpAddr,
        name: &str,
        record_type: RecordType,
    ) -> Result<Vec<String>, DomainError> {
        self.calls.lock().unwrap().push(DispatchCall {
            server,
            name: name.to_string(),
            record_type,
            at: Instant::now(),
        });

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if let Some(left) = failures.get_mut(name) {
                if *left > 0 {
                    *left -= 1;
                    return Err(DomainError::QueryTimeout);
                }
            }
        }

        if self.empty.lock().unwrap().iter().any(|n| n == name) {
            return Ok(Vec::new());
        }

        Ok(vec![Self::answer(name, record_type)])
    }
}
