//! Marketing notifier
//!
//! Best-effort bridge to the mail platform (subscriber upserts that trigger
//! tag-based automations) and the private community platform (membership
//! grants). Neither call sits on the fulfillment critical path: failures are
//! logged and reported as `false`, never as errors. Without API keys the
//! notifier runs in mock mode and only logs what it would have sent.

use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use vellum_common::Error;

use crate::config::{CommunityConfig, MailerConfig};

const NOTIFY_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "vellum-of/0.1.0 (https://github.com/vellum/vellum)";

/// Sent after the sale webhook creates an order; the mail platform reacts by
/// mailing the intake form link.
pub const TAG_PURCHASE_COMPLETE: &str = "PURCHASE_COMPLETE_AWAITING_FORM";
/// Sent once the finished ebook is persisted; the mail platform reacts by
/// mailing the delivery email.
pub const TAG_EBOOK_READY: &str = "EBOOK_READY_DELIVERY";

#[derive(Debug, Serialize)]
struct SubscriberUpsert<'a> {
    email: &'a str,
    fields: SubscriberFields<'a>,
    groups: [&'a str; 1],
}

#[derive(Debug, Serialize)]
struct SubscriberFields<'a> {
    name: &'a str,
    event_tag: &'a str,
}

#[derive(Debug, Serialize)]
struct MembershipGrant<'a> {
    email: &'a str,
}

/// Outbound marketing notifications
#[derive(Debug)]
pub struct Notifier {
    http_client: reqwest::Client,
    mailer: MailerConfig,
    community: CommunityConfig,
}

impl Notifier {
    pub fn new(mailer: MailerConfig, community: CommunityConfig) -> vellum_common::Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Internal(format!("build HTTP client: {}", e)))?;

        if mailer.api_key.is_none() {
            info!("Mail platform key not set, notifications run in mock mode");
        }
        if community.api_key.is_none() {
            info!("Community platform key not set, membership grants run in mock mode");
        }

        Ok(Self {
            http_client,
            mailer,
            community,
        })
    }

    /// Upsert the subscriber with an event tag, triggering the matching
    /// automation on the mail platform. Returns whether the call succeeded.
    pub async fn notify(&self, email: &str, display_name: &str, event_tag: &str) -> bool {
        let Some(api_key) = self.mailer.api_key.as_deref() else {
            info!(email = %email, tag = %event_tag, "[mock] Would upsert mail subscriber");
            return true;
        };

        let url = format!("{}/subscribers", self.mailer.base_url);
        let body = SubscriberUpsert {
            email,
            fields: SubscriberFields {
                name: display_name,
                event_tag,
            },
            groups: [self.mailer.group.as_str()],
        };

        let result = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(email = %email, tag = %event_tag, "Mail subscriber upserted");
                true
            }
            Ok(response) => {
                warn!(
                    email = %email,
                    tag = %event_tag,
                    status = response.status().as_u16(),
                    "Mail platform rejected subscriber upsert"
                );
                false
            }
            Err(e) => {
                warn!(email = %email, tag = %event_tag, error = %e, "Mail platform unreachable");
                false
            }
        }
    }

    /// Grant the customer access to the private community. Returns whether
    /// the call succeeded.
    pub async fn grant_community_access(&self, email: &str) -> bool {
        let community = self.community.community.as_str();
        let Some(api_key) = self.community.api_key.as_deref() else {
            info!(email = %email, community = %community, "[mock] Would grant community access");
            return true;
        };

        let url = format!(
            "{}/communities/{}/members",
            self.community.base_url, community
        );

        let result = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&MembershipGrant { email })
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!(email = %email, community = %community, "Community access granted");
                true
            }
            Ok(response) => {
                warn!(
                    email = %email,
                    community = %community,
                    status = response.status().as_u16(),
                    "Community platform rejected membership grant"
                );
                false
            }
            Err(e) => {
                warn!(email = %email, community = %community, error = %e, "Community platform unreachable");
                false
            }
        }
    }
}
