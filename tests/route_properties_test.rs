use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use warehouse_routes::core::context::PipelineContext;
use warehouse_routes::core::merge::merge_storehouses;
use warehouse_routes::core::sanitizer::FilterRules;
use warehouse_routes::domain::model::{Payload, RouteEntry};
use warehouse_routes::utils::retry::{retry_with_backoff, RetryPolicy};
use warehouse_routes::utils::slug::slugify;
use warehouse_routes::RouteError;

fn word() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("alpha".to_string()),
        Just("Beta".to_string()),
        Just("ADULT".to_string()),
        Just("ads".to_string()),
        Just("線路".to_string()),
        Just("".to_string()),
        "[a-zA-Z ]{0,8}",
    ]
}

fn host() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("good.example".to_string()),
        Just("cdn.bad.example".to_string()),
        Just("BAD.example".to_string()),
        Just("ads.example".to_string()),
        Just("cdn.示例.com".to_string()),
        Just("線路.example".to_string()),
        "[a-z]{1,6}\\.example",
    ]
}

fn raw_entry() -> impl Strategy<Value = Value> {
    (word(), host(), "[a-z/]{0,6}", any::<bool>()).prop_map(|(name, host, path, canonical)| {
        let url = format!("http://{}/{}", host, path);
        if canonical {
            json!({"sourceName": name, "sourceUrl": url})
        } else {
            json!({"name": name, "url": url})
        }
    })
}

fn route_entry() -> impl Strategy<Value = RouteEntry> {
    ("[a-c]", "[a-e]").prop_map(|(name, path)| {
        RouteEntry::new(name.clone(), format!("http://{}.example/{}", name, path), "o")
    })
}

fn rules_strategy() -> impl Strategy<Value = FilterRules> {
    (
        prop::collection::vec(word(), 0..3),
        prop::collection::vec(prop_oneof![Just("ads".to_string()), Just("/x".to_string())], 0..2),
        prop::collection::vec(prop_oneof![
            Just("bad.example".to_string()),
            Just("示例.com".to_string()),
            Just("".to_string()),
        ], 0..2),
    )
        .prop_map(|(keywords, url_keywords, domains)| {
            FilterRules::new(&keywords, &url_keywords, &domains)
        })
}

proptest! {
    /// 過濾後的結果不含任何會被規則封鎖的條目
    #[test]
    fn sanitized_entries_are_never_blocked(
        entries in prop::collection::vec(raw_entry(), 0..20),
        rules in rules_strategy(),
    ) {
        let unicode_domain_blocked = rules.blocked_domains.iter().any(|d| d == "xn--fsqs0x.com");
        let clean = rules.sanitize_storehouse(&entries, "origin");
        prop_assert!(clean.len() <= entries.len());
        for entry in &clean {
            prop_assert!(!entry.source_name.is_empty());
            prop_assert!(!entry.source_url.is_empty());
            prop_assert!(!rules.is_blocked(&entry.source_name, &entry.source_url));
            if unicode_domain_blocked {
                prop_assert!(!entry.source_url.contains("示例.com"));
            }
        }

        for entry in rules.sanitize_urls(&entries, "origin") {
            prop_assert!(!entry.url.is_empty());
            prop_assert!(!rules.is_blocked(&entry.name, &entry.url));
        }
    }

    /// 合併結果每個 URL 只出現一次，依首次出現順序
    #[test]
    fn merge_keeps_first_seen_unique_urls(
        first in prop::collection::vec(route_entry(), 0..10),
        second in prop::collection::vec(route_entry(), 0..10),
    ) {
        let mut context = PipelineContext::new();
        context.insert("first", Payload::storehouse(first.clone())).unwrap();
        context.insert("second", Payload::storehouse(second.clone())).unwrap();

        let merged = merge_storehouses(
            &context,
            "merged",
            &["first".to_string(), "second".to_string()],
        )
        .unwrap();

        let mut seen = HashSet::new();
        let expected: Vec<RouteEntry> = first
            .into_iter()
            .chain(second)
            .filter(|e| seen.insert(e.source_url.clone()))
            .collect();
        prop_assert_eq!(merged.route_entries(), expected.as_slice());
    }

    /// slug 為非空的小寫 ASCII 英數片段，以單一 `-` 連接
    #[test]
    fn slugs_are_url_safe(value in "\\PC{0,24}") {
        let slug = slugify(&value);
        prop_assert!(!slug.is_empty());
        prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
        prop_assert!(!slug.contains("--"));
        prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
    }

    /// 移動最後一筆只旋轉清單，不增減條目
    #[test]
    fn promote_last_is_a_rotation(entries in prop::collection::vec(route_entry(), 0..8)) {
        let mut payload = Payload::storehouse(entries.clone());
        payload.promote_last();

        let mut expected = entries;
        if !expected.is_empty() {
            expected.rotate_right(1);
        }
        prop_assert_eq!(payload.route_entries(), expected.as_slice());
    }

    /// 最多 N 次嘗試、先失敗 K 次時，共嘗試 min(K + 1, N) 次
    #[test]
    fn retry_spends_exactly_the_needed_attempts(attempts in 1u32..6, failures in 0u32..8) {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(attempts);

        let result = tokio_test::block_on(retry_with_backoff(&policy, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt <= failures {
                    Err(RouteError::HttpStatusError {
                        url: "http://flaky".to_string(),
                        status: 500 + attempt as u16,
                    })
                } else {
                    Ok(attempt)
                }
            }
        }));

        if failures < attempts {
            prop_assert_eq!(result.ok(), Some(failures + 1));
            prop_assert_eq!(calls.load(Ordering::SeqCst), failures + 1);
        } else {
            match result {
                Err(RouteError::HttpStatusError { status, .. }) => {
                    prop_assert_eq!(status, 500 + attempts as u16)
                }
                other => prop_assert!(false, "unexpected result: {:?}", other),
            }
            prop_assert_eq!(calls.load(Ordering::SeqCst), attempts);
        }
    }
}
