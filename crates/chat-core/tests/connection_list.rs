// crates/chat-core/tests/connection_list.rs
use chat_core::{ConnectionList, Visit};

fn values(list: &ConnectionList<&'static str>) -> Vec<&'static str> {
    list.iter().map(|(_, v)| *v).collect()
}

#[test]
fn add_then_remove_restores_previous_state() {
    let mut list = ConnectionList::new();
    list.push_back("a").unwrap();
    list.push_back("b").unwrap();
    let before = values(&list);

    let handle = list.push_back("c").unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list.remove(handle), Some("c"));

    assert_eq!(values(&list), before);
    assert_eq!(list.len(), 2);
}

#[test]
fn removing_head_middle_and_tail_keeps_links_consistent() {
    let mut list = ConnectionList::new();
    let a = list.push_back("a").unwrap();
    let b = list.push_back("b").unwrap();
    let c = list.push_back("c").unwrap();
    let d = list.push_back("d").unwrap();

    list.remove(b);
    assert_eq!(values(&list), ["a", "c", "d"]);
    list.remove(a);
    assert_eq!(values(&list), ["c", "d"]);
    list.remove(d);
    assert_eq!(values(&list), ["c"]);
    assert_eq!(list.first(), Some(c));
    assert_eq!(list.next_after(c), None);
    list.remove(c);
    assert!(list.is_empty());
    assert_eq!(list.first(), None);
}

#[test]
fn second_remove_of_same_handle_is_a_no_op() {
    let mut list = ConnectionList::new();
    let a = list.push_back("a").unwrap();
    list.push_back("b").unwrap();

    assert_eq!(list.remove(a), Some("a"));
    assert_eq!(list.remove(a), None);
    assert_eq!(values(&list), ["b"]);
}

#[test]
fn stale_handle_does_not_hit_reused_slot() {
    let mut list = ConnectionList::new();
    let a = list.push_back("a").unwrap();
    list.remove(a);

    // Reuses the freed slot.
    let b = list.push_back("b").unwrap();
    assert_eq!(a.index(), b.index());

    assert!(!list.contains(a));
    assert_eq!(list.get(a), None);
    assert_eq!(list.remove(a), None);
    assert_eq!(list.get(b), Some(&"b"));
}

#[test]
fn reused_slots_still_iterate_in_insertion_order() {
    let mut list = ConnectionList::new();
    let a = list.push_back("a").unwrap();
    list.push_back("b").unwrap();
    list.remove(a);
    list.push_back("c").unwrap(); // lands in a's old slot
    list.push_back("d").unwrap();

    assert_eq!(values(&list), ["b", "c", "d"]);
}

#[test]
fn for_each_can_prune_the_visited_entry() {
    let mut list = ConnectionList::new();
    for name in ["a", "b", "c", "d"] {
        list.push_back(name).unwrap();
    }

    let mut visited = Vec::new();
    list.for_each(|_, value| {
        visited.push(*value);
        if *value == "b" {
            Visit::Remove
        } else {
            Visit::Keep
        }
    });

    assert_eq!(visited, ["a", "b", "c", "d"]);
    assert_eq!(values(&list), ["a", "c", "d"]);
}

#[test]
fn for_each_can_prune_everything() {
    let mut list = ConnectionList::new();
    for name in ["a", "b", "c"] {
        list.push_back(name).unwrap();
    }

    list.for_each(|_, _| Visit::Remove);

    assert!(list.is_empty());
    assert_eq!(list.iter().count(), 0);
    // Still usable afterwards.
    list.push_back("d").unwrap();
    assert_eq!(values(&list), ["d"]);
}

#[test]
fn get_mut_updates_in_place() {
    let mut list = ConnectionList::new();
    let h = list.push_back(1u32).unwrap();
    *list.get_mut(h).unwrap() += 41;
    assert_eq!(list.get(h), Some(&42));
}

#[test]
fn drain_returns_entries_in_insertion_order() {
    let mut list = ConnectionList::new();
    let a = list.push_back("a").unwrap();
    list.push_back("b").unwrap();
    list.push_back("c").unwrap();
    list.remove(a);
    list.push_back("d").unwrap();

    assert_eq!(list.drain(), ["b", "c", "d"]);
    assert!(list.is_empty());
}

#[test]
fn manual_cursor_survives_removal_of_current_entry() {
    let mut list = ConnectionList::new();
    for name in ["a", "b", "c"] {
        list.push_back(name).unwrap();
    }

    let mut seen = Vec::new();
    let mut cursor = list.first();
    while let Some(handle) = cursor {
        cursor = list.next_after(handle);
        seen.push(*list.get(handle).unwrap());
        list.remove(handle);
    }

    assert_eq!(seen, ["a", "b", "c"]);
    assert!(list.is_empty());
}
