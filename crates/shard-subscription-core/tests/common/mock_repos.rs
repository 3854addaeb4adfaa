//! In-memory repositories for testing
//!
//! The real implementations share one database, so the mocks share state
//! too: grant commits append to the same ledger the payment repository
//! reads, and commission accruals mutate the same bot-user rows.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use shard_db::{
    BotUserRepository, BotUserRow, CreateReward, DbError, DbResult, GrantRecord, PaymentRepository,
    PaymentRow, ReferralEdgeRow, ReferralRepository, ReferralRewardRow, SubscriberRepository,
    SubscriberRow, TopReferrerRow, TouchBotUser,
};
use shard_types::NotifyThreshold;

fn blank_subscriber(user_id: i64) -> SubscriberRow {
    SubscriberRow {
        user_id,
        subscribed: false,
        payment_date: None,
        expiry_date: None,
        config: None,
        last_update: None,
        notified_expiring_2d: false,
        notified_3d: false,
        notified_1d: false,
        notified_expired: false,
    }
}

fn blank_bot_user(user_id: i64, now: &str) -> BotUserRow {
    BotUserRow {
        user_id,
        username: None,
        first_name: None,
        last_name: None,
        first_interaction: Some(now.to_string()),
        last_interaction: Some(now.to_string()),
        referrer_id: None,
        trial_used: false,
        referral_balance: 0.0,
        total_referrals: 0,
    }
}

/// One shared in-memory store handed out as four repository views
#[derive(Clone)]
pub struct MockStore {
    pub subscribers: Arc<MockSubscriberRepository>,
    pub bot_users: Arc<MockBotUserRepository>,
    pub payments: Arc<MockPaymentRepository>,
    pub referrals: Arc<MockReferralRepository>,
}

impl MockStore {
    pub fn new() -> Self {
        let subs = Arc::new(DashMap::new());
        let users = Arc::new(DashMap::new());
        let ledger = Arc::new(DashMap::new());
        let payment_seq = Arc::new(AtomicI64::new(0));

        Self {
            subscribers: Arc::new(MockSubscriberRepository {
                subs: subs.clone(),
                ledger: ledger.clone(),
                payment_seq: payment_seq.clone(),
                references: Arc::new(DashMap::new()),
            }),
            bot_users: Arc::new(MockBotUserRepository {
                users: users.clone(),
            }),
            payments: Arc::new(MockPaymentRepository {
                ledger: ledger.clone(),
            }),
            referrals: Arc::new(MockReferralRepository {
                edges: Arc::new(DashMap::new()),
                edge_seq: AtomicI64::new(0),
                rewards: Arc::new(DashMap::new()),
                reward_seq: AtomicI64::new(0),
                users,
                subs,
                ledger,
            }),
        }
    }
}

/// In-memory subscriber repository
pub struct MockSubscriberRepository {
    subs: Arc<DashMap<i64, SubscriberRow>>,
    ledger: Arc<DashMap<i64, PaymentRow>>,
    payment_seq: Arc<AtomicI64>,
    references: Arc<DashMap<String, ()>>,
}

impl MockSubscriberRepository {
    /// Seed a subscriber row directly
    pub fn insert(&self, row: SubscriberRow) {
        self.subs.insert(row.user_id, row);
    }

    #[allow(dead_code)]
    pub fn get(&self, user_id: i64) -> Option<SubscriberRow> {
        self.subs.get(&user_id).map(|r| r.value().clone())
    }
}

#[async_trait]
impl SubscriberRepository for MockSubscriberRepository {
    async fn find(&self, user_id: i64) -> DbResult<Option<SubscriberRow>> {
        Ok(self.subs.get(&user_id).map(|r| r.value().clone()))
    }

    async fn commit_grant(&self, grant: GrantRecord) -> DbResult<()> {
        if let Some(ref reference) = grant.reference {
            if self.references.contains_key(reference) {
                return Err(DbError::Duplicate);
            }
            self.references.insert(reference.clone(), ());
        }
        let id = self.payment_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.ledger.insert(
            id,
            PaymentRow {
                id,
                user_id: grant.user_id,
                amount: grant.amount,
                period: grant.period,
                payment_date: Some(grant.payment_date.clone()),
                payment_method: grant.method.clone(),
                reference: grant.reference.clone(),
            },
        );
        let mut row = self
            .subs
            .entry(grant.user_id)
            .or_insert_with(|| blank_subscriber(grant.user_id));
        row.subscribed = true;
        row.payment_date = Some(grant.payment_date.clone());
        row.expiry_date = Some(grant.expiry_date);
        row.config = Some(grant.config);
        row.last_update = Some(grant.payment_date);
        row.notified_expiring_2d = false;
        row.notified_3d = false;
        row.notified_1d = false;
        row.notified_expired = false;
        Ok(())
    }

    async fn set_subscribed(&self, user_id: i64, subscribed: bool) -> DbResult<()> {
        if let Some(mut row) = self.subs.get_mut(&user_id) {
            row.subscribed = subscribed;
        }
        Ok(())
    }

    async fn force_expiry(&self, user_id: i64, expiry: &str, subscribed: bool) -> DbResult<()> {
        if let Some(mut row) = self.subs.get_mut(&user_id) {
            row.expiry_date = Some(expiry.to_string());
            row.subscribed = subscribed;
            row.notified_expiring_2d = false;
            row.notified_3d = false;
            row.notified_1d = false;
            row.notified_expired = false;
        }
        Ok(())
    }

    async fn list_subscribed(&self) -> DbResult<Vec<SubscriberRow>> {
        let mut rows: Vec<SubscriberRow> = self
            .subs
            .iter()
            .filter(|r| r.subscribed)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| r.user_id);
        Ok(rows)
    }

    async fn mark_notified(&self, user_id: i64, threshold: NotifyThreshold) -> DbResult<()> {
        if let Some(mut row) = self.subs.get_mut(&user_id) {
            match threshold {
                NotifyThreshold::ThreeDays => row.notified_3d = true,
                NotifyThreshold::OneDay => row.notified_1d = true,
                NotifyThreshold::Expired => row.notified_expired = true,
                NotifyThreshold::LegacyTwoDays => row.notified_expiring_2d = true,
            }
        }
        Ok(())
    }

    async fn delete(&self, user_id: i64) -> DbResult<()> {
        self.subs.remove(&user_id);
        Ok(())
    }
}

/// In-memory bot user repository
pub struct MockBotUserRepository {
    users: Arc<DashMap<i64, BotUserRow>>,
}

impl MockBotUserRepository {
    /// Seed a bot user row directly
    pub fn insert(&self, row: BotUserRow) {
        self.users.insert(row.user_id, row);
    }

    pub fn get(&self, user_id: i64) -> Option<BotUserRow> {
        self.users.get(&user_id).map(|r| r.value().clone())
    }

    /// Seed a bare record with a first interaction stamp
    pub fn seed(&self, user_id: i64, first_interaction: &str) {
        self.users
            .insert(user_id, blank_bot_user(user_id, first_interaction));
    }
}

#[async_trait]
impl BotUserRepository for MockBotUserRepository {
    async fn find(&self, user_id: i64) -> DbResult<Option<BotUserRow>> {
        Ok(self.users.get(&user_id).map(|r| r.value().clone()))
    }

    async fn touch(&self, user: TouchBotUser) -> DbResult<bool> {
        if let Some(mut row) = self.users.get_mut(&user.user_id) {
            row.username = user.username;
            row.first_name = user.first_name;
            row.last_name = user.last_name;
            row.last_interaction = Some(user.now);
            return Ok(false);
        }
        let mut row = blank_bot_user(user.user_id, &user.now);
        row.username = user.username;
        row.first_name = user.first_name;
        row.last_name = user.last_name;
        self.users.insert(user.user_id, row);
        Ok(true)
    }

    async fn ensure_exists(&self, user_id: i64, now: &str) -> DbResult<bool> {
        if self.users.contains_key(&user_id) {
            return Ok(false);
        }
        self.users.insert(user_id, blank_bot_user(user_id, now));
        Ok(true)
    }

    async fn set_trial_used(&self, user_id: i64) -> DbResult<()> {
        if let Some(mut row) = self.users.get_mut(&user_id) {
            row.trial_used = true;
        }
        Ok(())
    }

    async fn first_interactions(&self, user_ids: &[i64]) -> DbResult<Vec<(i64, Option<String>)>> {
        Ok(user_ids
            .iter()
            .filter_map(|id| {
                self.users
                    .get(id)
                    .map(|r| (*id, r.first_interaction.clone()))
            })
            .collect())
    }

    async fn delete(&self, user_id: i64) -> DbResult<()> {
        self.users.remove(&user_id);
        Ok(())
    }
}

/// In-memory payment ledger repository
pub struct MockPaymentRepository {
    ledger: Arc<DashMap<i64, PaymentRow>>,
}

impl MockPaymentRepository {
    pub fn all_for(&self, user_id: i64) -> Vec<PaymentRow> {
        let mut rows: Vec<PaymentRow> = self
            .ledger
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| r.id);
        rows
    }
}

#[async_trait]
impl PaymentRepository for MockPaymentRepository {
    async fn has_paid(&self, user_id: i64) -> DbResult<bool> {
        Ok(self
            .ledger
            .iter()
            .any(|r| r.user_id == user_id && r.payment_method != "trial"))
    }

    async fn history(&self, user_id: i64, limit: i64) -> DbResult<Vec<PaymentRow>> {
        let mut rows = self.all_for(user_id);
        rows.reverse();
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn delete_for_user(&self, user_id: i64) -> DbResult<()> {
        self.ledger.retain(|_, r| r.user_id != user_id);
        Ok(())
    }
}

/// In-memory referral repository, keyed by referred user (one edge each)
pub struct MockReferralRepository {
    edges: Arc<DashMap<i64, ReferralEdgeRow>>,
    edge_seq: AtomicI64,
    rewards: Arc<DashMap<i64, ReferralRewardRow>>,
    reward_seq: AtomicI64,
    users: Arc<DashMap<i64, BotUserRow>>,
    subs: Arc<DashMap<i64, SubscriberRow>>,
    ledger: Arc<DashMap<i64, PaymentRow>>,
}

impl MockReferralRepository {
    fn has_real_payment(&self, user_id: i64) -> bool {
        self.ledger
            .iter()
            .any(|r| r.user_id == user_id && r.payment_method != "trial")
    }
}

#[async_trait]
impl ReferralRepository for MockReferralRepository {
    async fn attach(&self, referrer_id: i64, referred_id: i64, date: &str) -> DbResult<()> {
        if self.edges.contains_key(&referred_id) {
            return Err(DbError::Duplicate);
        }
        let id = self.edge_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.edges.insert(
            referred_id,
            ReferralEdgeRow {
                id,
                referrer_id,
                referred_id,
                referral_date: Some(date.to_string()),
            },
        );
        if let Some(mut row) = self.users.get_mut(&referred_id) {
            row.referrer_id = Some(referrer_id);
        }
        if let Some(mut row) = self.users.get_mut(&referrer_id) {
            row.total_referrals += 1;
        }
        Ok(())
    }

    async fn referrer_of(&self, user_id: i64) -> DbResult<Option<i64>> {
        Ok(self.users.get(&user_id).and_then(|r| r.referrer_id))
    }

    async fn direct_referrals(&self, user_id: i64) -> DbResult<Vec<i64>> {
        let mut edges: Vec<(i64, i64)> = self
            .edges
            .iter()
            .filter(|e| e.referrer_id == user_id)
            .map(|e| (e.id, e.referred_id))
            .collect();
        edges.sort();
        Ok(edges.into_iter().map(|(_, referred)| referred).collect())
    }

    async fn has_edge(&self, referred_id: i64) -> DbResult<bool> {
        Ok(self.edges.contains_key(&referred_id))
    }

    async fn accrue(&self, reward: CreateReward) -> DbResult<()> {
        if let Some(mut row) = self.users.get_mut(&reward.beneficiary_id) {
            row.referral_balance += reward.amount;
        }
        let id = self.reward_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.rewards.insert(
            id,
            ReferralRewardRow {
                id,
                payer_id: reward.payer_id,
                beneficiary_id: reward.beneficiary_id,
                level: reward.level,
                amount: reward.amount,
                created_at: reward.created_at,
                method: reward.method,
            },
        );
        Ok(())
    }

    async fn balance(&self, user_id: i64) -> DbResult<f64> {
        Ok(self
            .users
            .get(&user_id)
            .map(|r| r.referral_balance)
            .unwrap_or(0.0))
    }

    async fn rewards_for(&self, beneficiary_id: i64) -> DbResult<Vec<ReferralRewardRow>> {
        let mut rows: Vec<ReferralRewardRow> = self
            .rewards
            .iter()
            .filter(|r| r.beneficiary_id == beneficiary_id)
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.id));
        Ok(rows)
    }

    async fn conversion_counts(&self) -> DbResult<(i64, i64)> {
        let total = self.edges.len() as i64;
        let subscribed = self
            .edges
            .iter()
            .filter(|e| {
                self.subs
                    .get(&e.referred_id)
                    .map(|s| s.subscribed)
                    .unwrap_or(false)
                    && self.has_real_payment(e.referred_id)
            })
            .count() as i64;
        Ok((total, subscribed))
    }

    async fn top_referrers(&self, limit: i64) -> DbResult<Vec<TopReferrerRow>> {
        let mut by_referrer: std::collections::HashMap<i64, (i64, i64)> =
            std::collections::HashMap::new();
        for edge in self.edges.iter() {
            let entry = by_referrer.entry(edge.referrer_id).or_default();
            entry.0 += 1;
            let paid = self
                .subs
                .get(&edge.referred_id)
                .map(|s| s.subscribed)
                .unwrap_or(false)
                && self.has_real_payment(edge.referred_id);
            if paid {
                entry.1 += 1;
            }
        }
        let mut rows: Vec<TopReferrerRow> = by_referrer
            .into_iter()
            .map(|(referrer_id, (total_refs, paid_refs))| TopReferrerRow {
                referrer_id,
                total_refs,
                paid_refs,
            })
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.total_refs));
        rows.truncate(limit as usize);
        Ok(rows)
    }
}
