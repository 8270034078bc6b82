// tests/seen_hash_store.rs
use chrono::Utc;
use signal_digest::identity::hash_key;
use signal_digest::seen::{HashRecord, HashStore};

fn rec(title: &str) -> HashRecord {
    HashRecord {
        title: title.to_string(),
        source: "Paddock News".to_string(),
        recorded_at: Utc::now(),
    }
}

#[tokio::test]
async fn second_insert_is_ignored() {
    let store = HashStore::open_in_memory().await.unwrap();
    let h = hash_key("Leclerc on pole", "https://news.example.com/pole");

    assert!(store.insert(&h, &rec("Leclerc on pole")).await.unwrap());
    assert!(!store.insert(&h, &rec("Leclerc on pole (again)")).await.unwrap());
    assert_eq!(store.count().await.unwrap(), 1);

    // first write wins
    let got = store.get(&h).await.unwrap().unwrap();
    assert_eq!(got.title, "Leclerc on pole");
}

#[tokio::test]
async fn persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data").join("seen.db");
    let h = hash_key("t", "u");

    let store = HashStore::open(&db).await.unwrap();
    assert!(!store.has(&h).await.unwrap());
    store.insert(&h, &rec("t")).await.unwrap();
    store.close().await;

    let store = HashStore::open(&db).await.unwrap();
    assert!(store.has(&h).await.unwrap());
    assert!(!store.insert(&h, &rec("t")).await.unwrap());
    store.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inserts_of_one_hash_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let store = HashStore::open(&dir.path().join("seen.db")).await.unwrap();
    let h = hash_key("Leclerc on pole", "https://news.example.com/pole");
    let (a, b, c, d) = (rec("a"), rec("b"), rec("c"), rec("d"));

    let (ra, rb, rc, rd) = tokio::join!(
        store.insert(&h, &a),
        store.insert(&h, &b),
        store.insert(&h, &c),
        store.insert(&h, &d),
    );
    let wins = [ra.unwrap(), rb.unwrap(), rc.unwrap(), rd.unwrap()]
        .iter()
        .filter(|w| **w)
        .count();
    assert_eq!(wins, 1);
    assert_eq!(store.count().await.unwrap(), 1);
    store.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_claim_each_hash_once() {
    use std::sync::Arc;

    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(HashStore::open(&dir.path().join("seen.db")).await.unwrap());

    // 16 tasks over 4 distinct hashes
    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let h = hash_key(&format!("story {}", i % 4), "https://news.example.com");
            store.insert(&h, &rec("t")).await.unwrap()
        }));
    }
    let mut wins = 0;
    for h in handles {
        if h.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 4);
    assert_eq!(store.count().await.unwrap(), 4);
}
