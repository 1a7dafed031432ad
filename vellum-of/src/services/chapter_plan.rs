//! Chapter planning
//!
//! Two title-planning policies coexist and stay distinct: the self-service
//! authoring flow numbers its chapters generically, while sale-triggered
//! fulfillment follows a fixed narrative arc. Both are pure functions of the
//! tier; a plan never changes once generation has started.

use vellum_common::model::Tier;

/// Which flow is asking for a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanPolicy {
    /// Self-service studio: a cover plus numbered chapters
    Authoring,
    /// Sale-triggered fulfillment: a fixed narrative arc
    Fulfillment,
}

const PREMIUM_ARC: [&str; 5] = [
    "Elite Vision",
    "Unique Mechanism",
    "Protocols",
    "Scale",
    "Conclusion",
];

const STANDARD_ARC: [&str; 3] = ["Introduction", "Method", "Steps"];

/// The fixed, ordered chapter titles for a tier under the given policy
pub fn chapter_plan(tier: Tier, policy: PlanPolicy) -> Vec<String> {
    match policy {
        PlanPolicy::Fulfillment => {
            let arc: &[&str] = match tier {
                Tier::Premium => &PREMIUM_ARC,
                Tier::Entry | Tier::Standard => &STANDARD_ARC,
            };
            arc.iter().map(|s| s.to_string()).collect()
        }
        PlanPolicy::Authoring => (0..tier.authoring_chapter_count())
            .map(|i| {
                if i == 0 {
                    "Cover".to_string()
                } else {
                    format!("Chapter {}", i)
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fulfillment_premium_follows_the_arc() {
        let plan = chapter_plan(Tier::Premium, PlanPolicy::Fulfillment);
        assert_eq!(
            plan,
            vec![
                "Elite Vision",
                "Unique Mechanism",
                "Protocols",
                "Scale",
                "Conclusion"
            ]
        );
    }

    #[test]
    fn fulfillment_lower_tiers_share_the_short_arc() {
        let entry = chapter_plan(Tier::Entry, PlanPolicy::Fulfillment);
        let standard = chapter_plan(Tier::Standard, PlanPolicy::Fulfillment);
        assert_eq!(entry, vec!["Introduction", "Method", "Steps"]);
        assert_eq!(entry, standard);
    }

    #[test]
    fn authoring_counts_track_the_tier() {
        assert_eq!(chapter_plan(Tier::Entry, PlanPolicy::Authoring).len(), 3);
        assert_eq!(chapter_plan(Tier::Standard, PlanPolicy::Authoring).len(), 7);
        assert_eq!(chapter_plan(Tier::Premium, PlanPolicy::Authoring).len(), 10);
    }

    #[test]
    fn authoring_leads_with_the_cover() {
        let plan = chapter_plan(Tier::Entry, PlanPolicy::Authoring);
        assert_eq!(plan, vec!["Cover", "Chapter 1", "Chapter 2"]);
    }

    #[test]
    fn plans_are_deterministic() {
        for tier in [Tier::Entry, Tier::Standard, Tier::Premium] {
            for policy in [PlanPolicy::Authoring, PlanPolicy::Fulfillment] {
                let first = chapter_plan(tier, policy);
                assert!(!first.is_empty());
                assert_eq!(first, chapter_plan(tier, policy));
            }
        }
    }
}
