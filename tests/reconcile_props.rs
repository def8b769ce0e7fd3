use proptest::prelude::*;
use spark_view::{MemoryBackend, PatchTarget, Patcher, VNode};
use std::collections::BTreeSet;

fn keyed_list(keys: &[i64]) -> VNode {
    VNode::element("ul").children(
        keys.iter()
            .map(|k| VNode::element("li").key(*k).text_content(k.to_string())),
    )
}

fn expected_html(keys: &[i64]) -> String {
    let items: String = keys.iter().map(|k| format!("<li>{k}</li>")).collect();
    format!("<ul>{items}</ul>")
}

fn distinct_keys() -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(0i64..64, 0..12).prop_map(|set: BTreeSet<i64>| set.into_iter().collect())
}

proptest! {
    #[test]
    fn permutation_moves_existing_nodes(
        (old_keys, new_keys) in distinct_keys().prop_flat_map(|keys| (Just(keys.clone()), Just(keys).prop_shuffle()))
    ) {
        let backend = MemoryBackend::new();
        let patcher = Patcher::new(backend.clone());
        let mut old = keyed_list(&old_keys);
        let ul = patcher.patch(None, &mut old).unwrap();
        let before: Vec<_> = backend.children(ul);
        backend.clear_ops();

        let mut new = keyed_list(&new_keys);
        let root = patcher.patch(Some(PatchTarget::VNode(old)), &mut new).unwrap();

        prop_assert_eq!(root, ul);
        prop_assert_eq!(backend.created_count(), 0);
        prop_assert_eq!(backend.to_html(ul), expected_html(&new_keys));
        let after: BTreeSet<_> = backend.children(ul).into_iter().collect();
        prop_assert_eq!(after, before.into_iter().collect::<BTreeSet<_>>());
    }

    #[test]
    fn identical_snapshot_is_a_no_op(keys in distinct_keys()) {
        let backend = MemoryBackend::new();
        let patcher = Patcher::new(backend.clone());
        let mut old = keyed_list(&keys);
        patcher.patch(None, &mut old).unwrap();
        backend.clear_ops();

        let mut new = keyed_list(&keys);
        patcher.patch(Some(PatchTarget::VNode(old)), &mut new).unwrap();
        prop_assert!(backend.ops().is_empty());
    }

    #[test]
    fn arbitrary_edit_matches_fresh_render(old_keys in distinct_keys(), new_keys in distinct_keys()) {
        let backend = MemoryBackend::new();
        let patcher = Patcher::new(backend.clone());
        let mut old = keyed_list(&old_keys);
        let ul = patcher.patch(None, &mut old).unwrap();
        let survivors: Vec<_> = backend
            .children(ul)
            .into_iter()
            .zip(old_keys.iter().copied())
            .filter(|(_, k)| new_keys.contains(k))
            .collect();
        backend.clear_ops();

        let mut new = keyed_list(&new_keys);
        patcher.patch(Some(PatchTarget::VNode(old)), &mut new).unwrap();

        prop_assert_eq!(backend.to_html(ul), expected_html(&new_keys));
        let inserted = new_keys.iter().filter(|k| !old_keys.contains(k)).count();
        prop_assert_eq!(backend.created_count(), inserted);
        let live = backend.children(ul);
        for (node, key) in survivors {
            let at = new_keys.iter().position(|k| *k == key).unwrap();
            prop_assert_eq!(live[at], node);
        }
    }
}
