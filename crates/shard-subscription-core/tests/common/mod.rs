//! Common test utilities for shard-subscription-core integration tests

// Each test binary uses a different slice of these helpers.
#![allow(dead_code)]

pub mod mock_gateway;
pub mod mock_repos;

use std::sync::Arc;

use chrono::NaiveDateTime;
use shard_subscription_core::{
    timefmt, CoreConfig, PaymentConfirmer, ReferralService, SubscriptionService,
};

#[allow(unused_imports)]
pub use mock_gateway::{MockGateway, RecordingNotifier};
#[allow(unused_imports)]
pub use mock_repos::{
    MockBotUserRepository, MockPaymentRepository, MockReferralRepository, MockStore,
    MockSubscriberRepository,
};

pub type TestSubscriptionService = SubscriptionService<
    MockSubscriberRepository,
    MockBotUserRepository,
    MockPaymentRepository,
    MockGateway,
>;
pub type TestReferralService = ReferralService<MockReferralRepository, MockBotUserRepository>;
pub type TestPaymentConfirmer = PaymentConfirmer<
    MockSubscriberRepository,
    MockBotUserRepository,
    MockPaymentRepository,
    MockGateway,
    MockReferralRepository,
>;

/// Fully wired in-memory environment
pub struct TestEnv {
    pub store: MockStore,
    pub gateway: Arc<MockGateway>,
    pub subscriptions: Arc<TestSubscriptionService>,
    pub referrals: Arc<TestReferralService>,
    pub confirmer: TestPaymentConfirmer,
}

pub fn test_config() -> CoreConfig {
    CoreConfig::new("http://gateway.test", "test-key")
}

pub fn env() -> TestEnv {
    let store = MockStore::new();
    let gateway = Arc::new(MockGateway::new());
    let subscriptions = Arc::new(SubscriptionService::new(
        test_config(),
        store.subscribers.clone(),
        store.bot_users.clone(),
        store.payments.clone(),
        gateway.clone(),
    ));
    let referrals = Arc::new(ReferralService::new(
        store.referrals.clone(),
        store.bot_users.clone(),
    ));
    let confirmer = PaymentConfirmer::new(subscriptions.clone(), referrals.clone());
    TestEnv {
        store,
        gateway,
        subscriptions,
        referrals,
        confirmer,
    }
}

/// Parse a `%d.%m.%Y %H:%M` stamp for fixtures
pub fn dt(s: &str) -> NaiveDateTime {
    timefmt::parse_stamp(s).unwrap()
}
