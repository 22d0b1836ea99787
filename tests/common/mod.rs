//! Common test utilities
//!
//! A small bank-account domain used by the integration tests. State is
//! derived from events, never directly mutated.

use chrono::{DateTime, Utc};
use eventledger::{Aggregate, Recordable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bank-account events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BankAccountEvent {
    /// Account was opened
    Opened {
        account_id: Uuid,
        version: i64,
        full_name: String,
        opened_at: DateTime<Utc>,
    },

    /// Money was paid in
    Deposited {
        account_id: Uuid,
        version: i64,
        amount_cents: i64,
        deposited_at: DateTime<Utc>,
    },

    /// Money was paid out
    Withdrawn {
        account_id: Uuid,
        version: i64,
        amount_cents: i64,
        withdrawn_at: DateTime<Utc>,
    },
}

impl Recordable for BankAccountEvent {
    fn stream_id(&self) -> Uuid {
        match self {
            BankAccountEvent::Opened { account_id, .. } => *account_id,
            BankAccountEvent::Deposited { account_id, .. } => *account_id,
            BankAccountEvent::Withdrawn { account_id, .. } => *account_id,
        }
    }

    fn stream_version(&self) -> i64 {
        match self {
            BankAccountEvent::Opened { version, .. } => *version,
            BankAccountEvent::Deposited { version, .. } => *version,
            BankAccountEvent::Withdrawn { version, .. } => *version,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            BankAccountEvent::Opened { .. } => "Opened",
            BankAccountEvent::Deposited { .. } => "Deposited",
            BankAccountEvent::Withdrawn { .. } => "Withdrawn",
        }
    }
}

/// Bank-account aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: Uuid,
    pub version: i64,
    pub full_name: String,
    pub balance_cents: i64,
}

impl BankAccount {
    /// Open a new account and produce its creation event
    pub fn open(full_name: &str) -> (Self, BankAccountEvent) {
        let account_id = Uuid::new_v4();
        let event = BankAccountEvent::Opened {
            account_id,
            version: 1,
            full_name: full_name.to_string(),
            opened_at: Utc::now(),
        };
        let account = Self::default().apply(event.clone());
        (account, event)
    }

    /// Produce a deposit event at the next version
    pub fn deposit(&self, amount_cents: i64) -> BankAccountEvent {
        BankAccountEvent::Deposited {
            account_id: self.id,
            version: self.version + 1,
            amount_cents,
            deposited_at: Utc::now(),
        }
    }

    /// Produce a withdrawal event at the next version
    pub fn withdraw(&self, amount_cents: i64) -> BankAccountEvent {
        BankAccountEvent::Withdrawn {
            account_id: self.id,
            version: self.version + 1,
            amount_cents,
            withdrawn_at: Utc::now(),
        }
    }
}

impl Aggregate for BankAccount {
    type Event = BankAccountEvent;

    fn aggregate_type() -> &'static str {
        "BankAccount"
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(mut self, event: BankAccountEvent) -> Self {
        match event {
            BankAccountEvent::Opened {
                account_id,
                version,
                full_name,
                ..
            } => {
                self.id = account_id;
                self.version = version;
                self.full_name = full_name;
            }
            BankAccountEvent::Deposited {
                version,
                amount_cents,
                ..
            } => {
                self.balance_cents += amount_cents;
                self.version = version;
            }
            BankAccountEvent::Withdrawn {
                version,
                amount_cents,
                ..
            } => {
                self.balance_cents -= amount_cents;
                self.version = version;
            }
        }
        self
    }
}
