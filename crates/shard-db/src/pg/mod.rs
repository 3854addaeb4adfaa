//! PostgreSQL repository implementations

mod bot_user;
mod payment;
mod referral;
mod subscriber;

pub use bot_user::PgBotUserRepository;
pub use payment::PgPaymentRepository;
pub use referral::PgReferralRepository;
pub use subscriber::PgSubscriberRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub subscribers: PgSubscriberRepository,
    pub bot_users: PgBotUserRepository,
    pub payments: PgPaymentRepository,
    pub referrals: PgReferralRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            subscribers: PgSubscriberRepository::new(pool.clone()),
            bot_users: PgBotUserRepository::new(pool.clone()),
            payments: PgPaymentRepository::new(pool.clone()),
            referrals: PgReferralRepository::new(pool),
        }
    }
}
