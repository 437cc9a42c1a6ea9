//! Satisfy-group resolution (C7): collates a transaction's init-actions
//! into groups sharing a `satisfy_group` id, preserving first-occurrence
//! order of the ids. An empty group id makes every such action its own
//! singleton group.

use crate::model::PlanActionDef;

/// One group of one-or-more alternative actions. Singleton groups (empty
/// `satisfy_group`, or the only member of a named group) execute
/// unconditionally; multi-member groups pick the first member whose
/// `satisfy()` returns true.
pub type Group = Vec<PlanActionDef>;

pub fn group_actions(actions: &[PlanActionDef]) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    let mut index_of_group: Vec<(String, usize)> = Vec::new();

    for action in actions {
        let id = action.satisfy_group.as_deref().unwrap_or("");
        if id.is_empty() {
            groups.push(vec![action.clone()]);
            continue;
        }
        if let Some((_, group_idx)) = index_of_group.iter().find(|(gid, _)| gid == id) {
            groups[*group_idx].push(action.clone());
        } else {
            index_of_group.push((id.to_string(), groups.len()));
            groups.push(vec![action.clone()]);
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;

    fn action(kind: &str, group: Option<&str>) -> PlanActionDef {
        PlanActionDef { r#type: kind.to_string(), satisfy_group: group.map(str::to_string), args: IndexMap::new() }
    }

    #[test]
    fn empty_group_ids_are_singletons() {
        let actions = vec![action("log", None), action("log", Some(""))];
        let groups = group_actions(&actions);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 1);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn shared_group_id_collates_in_first_occurrence_order() {
        let actions = vec![action("url", Some("pick")), action("log", None), action("url", Some("pick"))];
        let groups = group_actions(&actions);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].len(), 1);
    }
}
