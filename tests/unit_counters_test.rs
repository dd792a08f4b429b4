use cachefront::core::UpstreamHost;
use cachefront::core::admission::RejectReason;
use cachefront::core::counters::Counters;

#[test]
fn test_requests_and_hits_tally_per_host() {
    let counters = Counters::new();
    counters.record_request(UpstreamHost::Global);
    counters.record_request(UpstreamHost::Global);
    counters.record_request(UpstreamHost::Image);
    counters.record_hit(UpstreamHost::Global);
    counters.record_hit(UpstreamHost::Image);

    let snapshot = counters.snapshot();
    assert_eq!(snapshot.global_requests, 2);
    assert_eq!(snapshot.image_requests, 1);
    assert_eq!(snapshot.global_hits, 1);
    assert_eq!(snapshot.image_hits, 1);
    // Hits and send_cache move together.
    assert_eq!(snapshot.send_cache, 2);
}

#[test]
fn test_drain_resets_only_the_per_second_pair() {
    let counters = Counters::new();
    counters.record_request(UpstreamHost::Global);
    counters.record_hit(UpstreamHost::Global);
    counters.record_cached_file();
    counters.record_cached_file();

    assert_eq!(counters.drain_per_second(), (2, 1));
    assert_eq!(counters.drain_per_second(), (0, 0));

    // The monotonic tallies survive the reset.
    let snapshot = counters.snapshot();
    assert_eq!(snapshot.global_requests, 1);
    assert_eq!(snapshot.global_hits, 1);
    assert_eq!(snapshot.send_cache, 0);
    assert_eq!(snapshot.cached_file, 0);
}

#[test]
fn test_each_rejection_reason_has_its_own_tally() {
    let counters = Counters::new();
    let reasons = [
        RejectReason::FilesizeError,
        RejectReason::CacheException,
        RejectReason::StatusError,
        RejectReason::StatusError,
        RejectReason::MethodError,
        RejectReason::CacheControlError,
        RejectReason::ContentTypeError,
    ];
    for reason in reasons {
        counters.record_rejection(reason);
    }

    let snapshot = counters.snapshot();
    assert_eq!(snapshot.filesize_error, 1);
    assert_eq!(snapshot.cache_exception, 1);
    assert_eq!(snapshot.status_error, 2);
    assert_eq!(snapshot.method_error, 1);
    assert_eq!(snapshot.cache_control_error, 1);
    assert_eq!(snapshot.content_type_error, 1);
}

#[test]
fn test_counters_are_shareable_across_threads() {
    let counters = std::sync::Arc::new(Counters::new());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let counters = counters.clone();
        handles.push(std::thread::spawn(move || {
            for _ in 0..1000 {
                counters.record_request(UpstreamHost::Global);
                counters.record_hit(UpstreamHost::Global);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = counters.snapshot();
    assert_eq!(snapshot.global_requests, 8000);
    assert_eq!(snapshot.global_hits, 8000);
    assert_eq!(snapshot.send_cache, 8000);
}
