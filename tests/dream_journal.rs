use reverie::analysis::WordFrequencyAnalyzer;
use reverie::error::LedgerError;
use reverie::model::{Record, RecordId, RecordTag};
use reverie::storage::LedgerImage;
use reverie::Ledger;

const OWNER: &str = "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM";

fn themes(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_submit_and_fetch_dream() {
    let ledger = Ledger::new(OWNER);
    let id = ledger
    .submit_dream("user1", "I was flying over a city of gold", themes(&["flying", "city", "gold"]))
    .unwrap();
    assert_eq!(id, 0);

    let dream = ledger.get_dream(id).unwrap();
    assert_eq!(dream.author, "user1");
    assert_eq!(dream.content, "I was flying over a city of gold");
    assert_eq!(dream.themes(), themes(&["flying", "city", "gold"]).as_slice());
    assert!(matches!(dream.tag, RecordTag::Dream { .. }));
    assert!(ledger.get_dream(1).is_none());
}

#[test]
fn test_dreams_by_multiple_dreamers() {
    let ledger = Ledger::new(OWNER);
    ledger.submit_dream("user1", "Flying dream", themes(&["flying"])).unwrap();
    ledger.submit_dream("user2", "Ocean dream", themes(&["water", "ocean"])).unwrap();
    ledger.submit_dream("user1", "Falling dream", themes(&["falling"])).unwrap();

    assert_eq!(ledger.list_dreams_by_author("user1"), vec![0, 2]);
    assert_eq!(ledger.list_dreams_by_author("user2"), vec![1]);
    assert!(ledger.list_dreams_by_author("user3").is_empty());
    assert_eq!(ledger.dream_count(), 3);
}

#[test]
fn test_dreams_accept_empty_fields() {
    let ledger = Ledger::new(OWNER);
    assert_eq!(ledger.submit_dream("user1", "", vec![]).unwrap(), 0);
    assert_eq!(ledger.get_dream(0).unwrap().themes().len(), 0);
}

#[test]
fn test_journals_are_independent() {
    let ledger = Ledger::new(OWNER);
    ledger.submit_thought("user1", "a thought", "c").unwrap();
    ledger.submit_thought("user1", "another", "c").unwrap();

    // Dream IDs have their own sequence
    assert_eq!(ledger.submit_dream("user1", "a dream", vec![]).unwrap(), 0);
    assert_eq!(ledger.list_by_author("user1"), vec![0, 1]);
    assert_eq!(ledger.list_dreams_by_author("user1"), vec![0]);

    // A dream ID never resolves as a thought and vice versa
    ledger.delete_thought(OWNER, 0).unwrap();
    assert!(ledger.get_thought(0).is_none());
    assert_eq!(ledger.get_dream(0).unwrap().content, "a dream");
    assert!(ledger.get_dream(1).is_none());
}

#[test]
fn test_analyze_dreams() {
    let ledger = Ledger::new(OWNER);
    ledger.submit_dream("user1", "flying over the sea", themes(&["flying"])).unwrap();
    ledger.submit_dream("user2", "Flying through clouds", themes(&["flying", "sky"])).unwrap();

    let analysis = ledger.analyze_dreams(&WordFrequencyAnalyzer::new());
    assert_eq!(analysis.common_words.first().map(String::as_str), Some("flying"));
    assert!((-1.0..=1.0).contains(&analysis.sentiment));

    let empty = Ledger::new(OWNER).analyze_dreams(&WordFrequencyAnalyzer::new());
    assert!(empty.common_words.is_empty());
}

#[test]
fn test_snapshot_restores_both_journals() {
    let ledger = Ledger::new(OWNER);
    ledger.submit_thought("alice", "first", "c1").unwrap();
    ledger.submit_thought("bob", "second", "c2").unwrap();
    ledger.submit_dream("alice", "a dream", themes(&["sky"])).unwrap();
    ledger.delete_thought(OWNER, 0).unwrap();

    let bytes = ledger.snapshot().unwrap();

    let copy = Ledger::new(OWNER);
    copy.restore(&bytes).unwrap();
    copy.verify_consistency().unwrap();

    assert!(copy.get_thought(0).is_none());
    assert_eq!(copy.get_thought(1).unwrap().content, "second");
    assert_eq!(copy.list_by_category("c2"), vec![1]);
    assert!(copy.list_by_author("alice").is_empty());
    assert_eq!(copy.list_dreams_by_author("alice"), vec![0]);

    // Allocators resume past everything ever issued
    assert_eq!(copy.submit_thought("carol", "third", "c1").unwrap(), 2);
    assert_eq!(copy.submit_dream("carol", "another", vec![]).unwrap(), 1);
}

#[test]
fn test_restore_rejects_garbage_and_keeps_state() {
    let ledger = Ledger::new(OWNER);
    ledger.submit_thought("alice", "keep me", "c").unwrap();

    assert_eq!(ledger.restore(&[0xde, 0xad, 0xbe, 0xef]), Err(LedgerError::CorruptSnapshot));
    assert_eq!(ledger.get_thought(0).unwrap().content, "keep me");
    assert_eq!(ledger.thought_count(), 1);
}

#[test]
fn test_restore_rejects_the_reserved_id() {
    let ledger = Ledger::new(OWNER);
    ledger.submit_thought("alice", "keep me", "c").unwrap();

    let thought_image = LedgerImage {
        thoughts: vec![Record::thought(RecordId::MAX, "a", "x", "c", 0)],
        ..LedgerImage::default()
    };
    assert_eq!(ledger.restore(&thought_image.encode().unwrap()), Err(LedgerError::CorruptSnapshot));

    let dream_image = LedgerImage {
        dreams: vec![Record::dream(RecordId::MAX, "d", "x", vec![], 0)],
        ..LedgerImage::default()
    };
    assert_eq!(ledger.restore(&dream_image.encode().unwrap()), Err(LedgerError::CorruptSnapshot));

    assert_eq!(ledger.get_thought(0).unwrap().content, "keep me");
    assert_eq!(ledger.submit_thought("alice", "next", "c").unwrap(), 1);
}

#[test]
fn test_exhausted_ids_fail_without_poisoning() {
    let image = LedgerImage {
        thoughts: vec![Record::thought(RecordId::MAX - 1, "a", "last", "c", 0)],
        ..LedgerImage::default()
    };
    let ledger = Ledger::new(OWNER);
    ledger.restore(&image.encode().unwrap()).unwrap();

    assert_eq!(ledger.submit_thought("a", "x", "c"), Err(LedgerError::IdsExhausted));
    assert_eq!(ledger.submit_thought("a", "y", "c"), Err(LedgerError::IdsExhausted));

    // The lock is intact: reads, deletes and the dream journal still work
    assert_eq!(ledger.list_by_author("a"), vec![RecordId::MAX - 1]);
    assert_eq!(ledger.thought_count(), 1);
    assert_eq!(ledger.submit_dream("d", "still fine", vec![]).unwrap(), 0);
    ledger.delete_thought(OWNER, RecordId::MAX - 1).unwrap();
    assert_eq!(ledger.submit_thought("a", "z", "c"), Err(LedgerError::IdsExhausted));
    ledger.verify_consistency().unwrap();
}
