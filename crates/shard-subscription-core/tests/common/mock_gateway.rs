//! Scripted provisioning gateway and recording notifier for tests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use shard_subscription_core::{CoreError, CoreResult, Notifier, ProvisioningGateway};
use shard_types::{NotifyThreshold, UserId};

/// Gateway that records calls and can be scripted to fail
#[derive(Default)]
pub struct MockGateway {
    pub fail_create: AtomicBool,
    pub fail_extend: AtomicBool,
    pub created: Mutex<Vec<(UserId, i64)>>,
    pub extended: Mutex<Vec<(String, i64)>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_extend(&self, fail: bool) {
        self.fail_extend.store(fail, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub fn created_calls(&self) -> Vec<(UserId, i64)> {
        self.created.lock().unwrap().clone()
    }

    pub fn extended_calls(&self) -> Vec<(String, i64)> {
        self.extended.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProvisioningGateway for MockGateway {
    async fn create_config(&self, user_id: UserId, days: i64) -> CoreResult<String> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(CoreError::Provisioning("scripted create failure".into()));
        }
        self.created.lock().unwrap().push((user_id, days));
        Ok(format!("cfg-{user_id}"))
    }

    async fn extend_config(&self, handle: &str, days: i64) -> CoreResult<()> {
        if self.fail_extend.load(Ordering::SeqCst) {
            return Err(CoreError::Provisioning("scripted extend failure".into()));
        }
        self.extended.lock().unwrap().push((handle.to_string(), days));
        Ok(())
    }
}

/// Notifier that records every dispatch and can be scripted to fail
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: AtomicBool,
    pub sent: Mutex<Vec<(UserId, NotifyThreshold)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent_calls(&self) -> Vec<(UserId, NotifyThreshold)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        user_id: UserId,
        threshold: NotifyThreshold,
        _expiry: &str,
    ) -> CoreResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            self.sent.lock().unwrap().push((user_id, threshold));
            return Err(CoreError::Internal("scripted dispatch failure".into()));
        }
        self.sent.lock().unwrap().push((user_id, threshold));
        Ok(())
    }
}
