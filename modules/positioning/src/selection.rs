use crate::{Criteria, ProviderInfo};
use common::provider::ProviderId;

/// Picks the provider that matches `criteria` best.
///
/// Providers listed in `excluded` and, with `enabled_only`, disabled
/// providers are never picked. The remaining providers are tried in passes:
/// first those meeting accuracy and cost, then those meeting only the cost
/// requirement, then any. Within a pass the most accurate provider wins and
/// ties keep the order of `providers`.
pub fn best_provider(
    providers: &[ProviderInfo],
    criteria: &Criteria,
    excluded: &[ProviderId],
) -> Option<ProviderId> {
    let candidates: Vec<&ProviderInfo> = providers
        .iter()
        .filter(|p| !criteria.enabled_only || p.enabled)
        .filter(|p| !excluded.contains(&p.id))
        .collect();

    let meets_accuracy = |p: &ProviderInfo| p.accuracy <= criteria.accuracy;
    let meets_cost = |p: &ProviderInfo| criteria.cost_allowed || !p.has_cost;

    let pick = |pass: &dyn Fn(&ProviderInfo) -> bool| {
        candidates
            .iter()
            .copied()
            .filter(|p| pass(*p))
            .min_by_key(|p| p.accuracy)
            .map(|p| p.id.clone())
    };

    pick(&|p| meets_accuracy(p) && meets_cost(p))
        .or_else(|| pick(&|p| meets_cost(p)))
        .or_else(|| pick(&|_| true))
}
