use bytes::Bytes;
use cachefront::core::fingerprint::Fingerprint;
use cachefront::core::record::CacheRecord;
use cachefront::core::store::file::{BODY_DIR, IMAGE_DIR};
use cachefront::core::store::{CacheStore, FileStore};
use cachefront::core::{GLOBAL_HOST, IMAGE_HOST};
use chrono::{Duration, Utc};
use regex::Regex;
use std::collections::HashMap;
use tempfile::TempDir;

fn record(url: &str, host: &str, body: &[u8], ttl_seconds: Option<i64>) -> CacheRecord {
    let now = Utc::now();
    let mut headers = HashMap::new();
    headers.insert(
        "cache-control".to_string(),
        vec!["public, max-age=1200".to_string()],
    );
    headers.insert("etag".to_string(), vec!["\"abc123\"".to_string()]);
    CacheRecord {
        headers,
        body: Bytes::copy_from_slice(body),
        url: url.to_string(),
        host: host.to_string(),
        blob_path: None,
        cached_at: now,
        expires_at: ttl_seconds.map(|s| now + Duration::seconds(s)),
    }
}

fn fingerprint(url: &str) -> Fingerprint {
    Fingerprint::from_canonical(format!("GET{url}"))
}

async fn store() -> (TempDir, FileStore) {
    let dir = TempDir::new().unwrap();
    let store = FileStore::new(dir.path());
    store.init().await.unwrap();
    (dir, store)
}

#[tokio::test]
async fn test_set_then_get_round_trips() {
    let (dir, store) = store().await;
    let fp = fingerprint("global.gmarket.co.kr/StaticData/Common.js");
    let original = record(
        "http://global.gmarket.co.kr/StaticData/Common.js",
        GLOBAL_HOST,
        b"var common = 1;",
        Some(3600),
    );

    store.set(fp.shard, &fp.digest, original.clone()).await.unwrap();
    let fetched = store.get(fp.shard, &fp.digest).await.unwrap().unwrap();

    assert_eq!(fetched.body, original.body);
    assert_eq!(fetched.headers, original.headers);
    assert_eq!(fetched.url, original.url);
    assert_eq!(fetched.host, original.host);
    assert_eq!(fetched.cached_at, original.cached_at);
    assert_eq!(fetched.expires_at, original.expires_at);

    // The blob sits in the non-image directory, named by the digest.
    let blob = dir.path().join(BODY_DIR).join(&fp.digest);
    assert_eq!(std::fs::read(&blob).unwrap(), b"var common = 1;");
}

#[tokio::test]
async fn test_image_records_use_the_image_directory() {
    let (dir, store) = store().await;
    let fp = fingerprint("image.gmarket.co.kr/service_image/a.jpg");
    let original = record(
        "http://image.gmarket.co.kr/service_image/a.jpg",
        IMAGE_HOST,
        b"\xff\xd8jpeg-bytes",
        Some(3600),
    );

    store.set(fp.shard, &fp.digest, original).await.unwrap();

    assert!(dir.path().join(IMAGE_DIR).join(&fp.digest).exists());
    assert!(!dir.path().join(BODY_DIR).join(&fp.digest).exists());
}

#[tokio::test]
async fn test_get_missing_record_is_none() {
    let (_dir, store) = store().await;
    let fp = fingerprint("global.gmarket.co.kr/nope");
    assert!(store.get(fp.shard, &fp.digest).await.unwrap().is_none());
}

#[tokio::test]
async fn test_del_removes_record_and_blob() {
    let (dir, store) = store().await;
    let fp = fingerprint("global.gmarket.co.kr/gone.js");
    store
        .set(
            fp.shard,
            &fp.digest,
            record("http://global.gmarket.co.kr/gone.js", GLOBAL_HOST, b"x", Some(60)),
        )
        .await
        .unwrap();

    store.del(fp.shard, &fp.digest).await.unwrap();

    assert!(store.get(fp.shard, &fp.digest).await.unwrap().is_none());
    assert!(!dir.path().join(BODY_DIR).join(&fp.digest).exists());
}

#[tokio::test]
async fn test_recache_replaces_the_whole_record() {
    let (dir, store) = store().await;
    let fp = fingerprint("global.gmarket.co.kr/page.html");
    let url = "http://global.gmarket.co.kr/page.html";

    store
        .set(fp.shard, &fp.digest, record(url, GLOBAL_HOST, b"first", Some(60)))
        .await
        .unwrap();
    store
        .set(fp.shard, &fp.digest, record(url, GLOBAL_HOST, b"second", Some(60)))
        .await
        .unwrap();

    let fetched = store.get(fp.shard, &fp.digest).await.unwrap().unwrap();
    assert_eq!(fetched.body, Bytes::from_static(b"second"));
    assert_eq!(
        std::fs::read(dir.path().join(BODY_DIR).join(&fp.digest)).unwrap(),
        b"second"
    );
}

#[tokio::test]
async fn test_concurrent_sets_leave_one_consistent_winner() {
    let (dir, store) = store().await;
    let store = std::sync::Arc::new(store);
    let fp = fingerprint("global.gmarket.co.kr/contended.html");
    let url = "http://global.gmarket.co.kr/contended.html";

    let first = {
        let store = store.clone();
        let fp = fp.clone();
        let rec = record(url, GLOBAL_HOST, b"AAAAAAAA", Some(60));
        tokio::spawn(async move { store.set(fp.shard, &fp.digest, rec).await })
    };
    let second = {
        let store = store.clone();
        let fp = fp.clone();
        let rec = record(url, GLOBAL_HOST, b"BBBBBBBB", Some(60));
        tokio::spawn(async move { store.set(fp.shard, &fp.digest, rec).await })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    // Exactly one of the two bodies wins, the index and the blob agree,
    // and no second blob file is left behind.
    let fetched = store.get(fp.shard, &fp.digest).await.unwrap().unwrap();
    assert!(
        fetched.body == Bytes::from_static(b"AAAAAAAA")
            || fetched.body == Bytes::from_static(b"BBBBBBBB")
    );
    let blob_dir = dir.path().join(BODY_DIR);
    let blobs: Vec<_> = std::fs::read_dir(&blob_dir).unwrap().collect();
    assert_eq!(blobs.len(), 1);
    assert_eq!(
        Bytes::from(std::fs::read(blob_dir.join(&fp.digest)).unwrap()),
        fetched.body
    );
}

#[tokio::test]
async fn test_sweep_removes_expired_records_and_blobs() {
    let (dir, store) = store().await;
    let expired_fp = fingerprint("global.gmarket.co.kr/expired.html");
    let zero_fp = fingerprint("global.gmarket.co.kr/zero.html");
    let live_fp = fingerprint("global.gmarket.co.kr/live.html");

    store
        .set(
            expired_fp.shard,
            &expired_fp.digest,
            record("http://global.gmarket.co.kr/expired.html", GLOBAL_HOST, b"old", Some(-5)),
        )
        .await
        .unwrap();
    // A record with the zero expiration is immediately stale.
    store
        .set(
            zero_fp.shard,
            &zero_fp.digest,
            record("http://global.gmarket.co.kr/zero.html", GLOBAL_HOST, b"zero", None),
        )
        .await
        .unwrap();
    store
        .set(
            live_fp.shard,
            &live_fp.digest,
            record("http://global.gmarket.co.kr/live.html", GLOBAL_HOST, b"new", Some(3600)),
        )
        .await
        .unwrap();

    let mut removed = store.sweep_expired(Utc::now()).await.unwrap();
    removed.sort();
    assert_eq!(
        removed,
        vec![
            "http://global.gmarket.co.kr/expired.html".to_string(),
            "http://global.gmarket.co.kr/zero.html".to_string(),
        ]
    );

    assert!(store.get(expired_fp.shard, &expired_fp.digest).await.unwrap().is_none());
    assert!(!dir.path().join(BODY_DIR).join(&expired_fp.digest).exists());
    assert!(store.get(live_fp.shard, &live_fp.digest).await.unwrap().is_some());
}

#[tokio::test]
async fn test_purge_matching_removes_only_matching_urls() {
    let (_dir, store) = store().await;
    let urls = [
        "http://global.gmarket.co.kr/StaticData/a.js",
        "http://global.gmarket.co.kr/StaticData/b.js",
        "http://global.gmarket.co.kr/other/c.js",
    ];
    for url in urls {
        let fp = fingerprint(url.trim_start_matches("http://"));
        store
            .set(fp.shard, &fp.digest, record(url, GLOBAL_HOST, b"js", Some(3600)))
            .await
            .unwrap();
    }

    let pattern = Regex::new(r"/StaticData/").unwrap();
    let mut purged = store.purge_matching(&pattern).await.unwrap();
    purged.sort();
    assert_eq!(
        purged,
        vec![
            "http://global.gmarket.co.kr/StaticData/a.js".to_string(),
            "http://global.gmarket.co.kr/StaticData/b.js".to_string(),
        ]
    );
    assert_eq!(store.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_get_all_reports_shards_and_digests() {
    let (_dir, store) = store().await;
    let fp = fingerprint("image.gmarket.co.kr/x.jpg");
    store
        .set(
            fp.shard,
            &fp.digest,
            record("http://image.gmarket.co.kr/x.jpg", IMAGE_HOST, b"img", Some(60)),
        )
        .await
        .unwrap();

    let entries = store.get_all().await.unwrap();
    assert_eq!(entries.len(), 1);
    let (shard, digest, rec) = &entries[0];
    assert_eq!(*shard, fp.shard);
    assert_eq!(digest, &fp.digest);
    assert_eq!(rec.url, "http://image.gmarket.co.kr/x.jpg");
}

#[tokio::test]
async fn test_clear_wipes_index_and_blob_directories() {
    let (dir, store) = store().await;
    let fp = fingerprint("global.gmarket.co.kr/wipe.html");
    store
        .set(
            fp.shard,
            &fp.digest,
            record("http://global.gmarket.co.kr/wipe.html", GLOBAL_HOST, b"x", Some(60)),
        )
        .await
        .unwrap();

    store.clear().await.unwrap();

    assert!(store.get_all().await.unwrap().is_empty());
    assert!(!dir.path().join(BODY_DIR).exists());
    assert!(!dir.path().join(IMAGE_DIR).exists());
}

#[test]
fn test_record_json_round_trip_matches_remote_wire_contract() {
    let original = record(
        "http://global.gmarket.co.kr/wire.html",
        GLOBAL_HOST,
        b"wire-body",
        Some(1200),
    );
    let raw = serde_json::to_string(&original).unwrap();
    let decoded: CacheRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(decoded, original);
}
