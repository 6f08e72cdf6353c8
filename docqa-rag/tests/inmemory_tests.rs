//! Property tests for vector store search ordering and cardinality.

use std::collections::HashMap;

use docqa_rag::document::IndexEntry;
use docqa_rag::inmemory::InMemoryVectorStore;
use docqa_rag::local::LocalVectorStore;
use docqa_rag::vectorstore::VectorStore;
use proptest::prelude::*;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

fn arb_entry(dim: usize) -> impl Strategy<Value = IndexEntry> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(id, text, embedding)| IndexEntry {
            id,
            text,
            embedding,
            metadata: HashMap::from([("source".to_string(), "doc.pdf".to_string())]),
        },
    )
}

/// Searching returns entries by descending cosine similarity, and exactly
/// `min(top_k, len)` of them.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_sized_min_k_n(
            entries in proptest::collection::vec(arb_entry(DIM), 0..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let n = entries.len();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.add(entries).await.unwrap();
                store.search(&query, top_k).await.unwrap()
            });

            prop_assert_eq!(results.len(), top_k.min(n));
            for pair in results.windows(2) {
                prop_assert!(
                    pair[0].score >= pair[1].score,
                    "results not in descending order: {} < {}",
                    pair[0].score,
                    pair[1].score,
                );
            }
        }
    }
}

/// The durable store ranks exactly like the in-memory one.
mod prop_local_matches_inmemory {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        #[test]
        fn same_ranking_after_reopen(
            entries in proptest::collection::vec(arb_entry(DIM), 1..12),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..6,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let temp = tempfile::tempdir().unwrap();

            let (expected, actual) = rt.block_on(async {
                let memory = InMemoryVectorStore::new();
                memory.add(entries.clone()).await.unwrap();

                let local = LocalVectorStore::create_or_open(temp.path(), "test-model", DIM)
                    .await
                    .unwrap();
                local.add(entries).await.unwrap();
                drop(local);
                let reopened = LocalVectorStore::open(temp.path(), "test-model").await.unwrap();

                (
                    memory.search(&query, top_k).await.unwrap(),
                    reopened.search(&query, top_k).await.unwrap(),
                )
            });

            let expected_ids: Vec<_> = expected.iter().map(|r| r.entry.id.clone()).collect();
            let actual_ids: Vec<_> = actual.iter().map(|r| r.entry.id.clone()).collect();
            prop_assert_eq!(expected_ids, actual_ids);
        }
    }
}

#[tokio::test]
async fn concurrent_searches_see_consistent_results() {
    let store = std::sync::Arc::new(InMemoryVectorStore::with_entries(vec![
        IndexEntry {
            id: "a".into(),
            text: "a".into(),
            embedding: vec![1.0, 0.0],
            metadata: HashMap::new(),
        },
        IndexEntry {
            id: "b".into(),
            text: "b".into(),
            embedding: vec![0.0, 1.0],
            metadata: HashMap::new(),
        },
    ]));

    let searches = (0..16).map(|i| {
        let store = store.clone();
        async move {
            let query = if i % 2 == 0 { [1.0, 0.0] } else { [0.0, 1.0] };
            store.search(&query, 1).await.unwrap()
        }
    });
    let results = futures::future::join_all(searches).await;

    for (i, hits) in results.iter().enumerate() {
        let expected = if i % 2 == 0 { "a" } else { "b" };
        assert_eq!(hits[0].entry.id, expected);
    }
}
