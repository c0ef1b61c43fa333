//! Integration tests for net crate

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use fetchr_config::Config;
    use fetchr_errors::{FailureKind, PlatformError};
    use fetchr_events::{channel, AppEvent, DownloadEvent, EventReceiver, GeneralEvent};
    use fetchr_net::transport::pairing::wire::{self, ResponseHead};
    use fetchr_net::*;
    use fetchr_platform::{
        NativeDownloadId, NativeDownloadRequest, NativeDownloadService, NativeDownloadState,
        NativeDownloadStatus, PairingAdapter, PairingLink, Platform,
    };
    use httpmock::prelude::*;
    use std::collections::{HashSet, VecDeque};
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::TcpListener;

    const CONTENT: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    fn factory_in(dir: &Path, platform: Platform) -> DownloaderFactory {
        let mut config = Config::default();
        config.paths.scratch_dir = Some(dir.to_path_buf());
        config.network.chunk_timeout = 5;
        config.pairing.read_timeout = 5;
        DownloaderFactory::new(&config, platform).unwrap()
    }

    fn download_events(rx: &mut EventReceiver) -> Vec<DownloadEvent> {
        let mut events = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::Download(event) = message.event {
                events.push(event);
            }
        }
        events
    }

    async fn drain_listener(
        rx: &mut tokio::sync::mpsc::UnboundedReceiver<ListenerEvent>,
    ) -> Vec<ListenerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    // ---- selection and gate ----

    #[test]
    fn test_selection_examples() {
        let url = parse_url("bluetooth://AA-BB-CC-DD-EE-FF/path").unwrap();
        assert_eq!(select(&url), TransportKind::ShortRangePairing);
        assert_eq!(pairing_address(&url).unwrap(), "AA:BB:CC:DD:EE:FF");

        let url = parse_url("http://fdroidorg6cooksyluodepej4erfctzk7rrjpjbbr6wx24jh3lqyfwyd.onion/fdroid/repo")
            .unwrap();
        assert_eq!(select(&url), TransportKind::AnonymizedOverlayHttp);
        assert!(!can_use_native_downloader(&url, 30));

        let url = parse_url("https://f-droid.org/repo/index-v1.jar").unwrap();
        assert_eq!(select(&url), TransportKind::ConventionalHttp);
        assert!(can_use_native_downloader(&url, MIN_NATIVE_DOWNLOAD_VERSION));
        assert!(!can_use_native_downloader(&url, MIN_NATIVE_DOWNLOAD_VERSION - 1));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn onion_hosts_always_overlay(
                scheme in prop::sample::select(vec!["http", "https", "ftp", "ws"]),
                label in "[a-z2-7]{8,56}",
                path in "(/[a-z0-9._-]{1,12}){0,4}",
            ) {
                let url = parse_url(&format!("{scheme}://{label}.onion{path}")).unwrap();
                prop_assert_eq!(select(&url), TransportKind::AnonymizedOverlayHttp);
            }

            #[test]
            fn plain_hosts_are_conventional(
                scheme in prop::sample::select(vec!["http", "https"]),
                label in "[a-z][a-z0-9]{0,20}",
                tld in prop::sample::select(vec!["org", "net", "io", "onion.example"]),
            ) {
                let url = parse_url(&format!("{scheme}://{label}.{tld}/repo")).unwrap();
                prop_assert_eq!(select(&url), TransportKind::ConventionalHttp);
            }
        }
    }

    // ---- destination resolver ----

    #[test]
    fn test_concurrent_resolves_are_unique() {
        let temp = tempdir().unwrap();
        let dir = temp.path().to_path_buf();

        let workers: Vec<_> = (0..16)
            .map(|_| {
                let dir = dir.clone();
                std::thread::spawn(move || {
                    (0..8)
                        .map(|_| resolve_destination(&dir).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for worker in workers {
            for path in worker.join().unwrap() {
                assert!(seen.insert(path), "destination handed out twice");
            }
        }
        assert_eq!(seen.len(), 128);
    }

    #[test]
    fn test_malformed_url_creates_no_scratch_file() {
        let temp = tempdir().unwrap();
        let factory = factory_in(temp.path(), Platform::headless());

        let err = factory.build("not a url", None).unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::MalformedInput);

        let err = factory.build("bluetooth://nearby-phone/repo", None).unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::MalformedInput);

        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_build_resolves_scratch_destination() {
        let temp = tempdir().unwrap();
        let factory = factory_in(temp.path(), Platform::headless());

        let transport = factory.build("https://f-droid.org/repo/index.jar", None).unwrap();
        assert_eq!(transport.kind(), TransportKind::ConventionalHttp);
        assert!(transport
            .destination()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(DESTINATION_PREFIX));
        assert!(transport.destination().exists());

        let transport = factory.build("http://example.onion/repo", None).unwrap();
        assert!(matches!(transport, Transport::Overlay(_)));
    }

    // ---- conventional HTTP ----

    #[tokio::test]
    async fn test_http_download_reports_progress_and_events() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/repo/index.jar");
            then.status(200).header("etag", "\"abc\"").body(CONTENT);
        });

        let temp = tempdir().unwrap();
        let (tx, mut rx) = channel();
        let factory = factory_in(temp.path(), Platform::headless()).with_events(tx);

        let mut transport = factory.build(&server.url("/repo/index.jar"), None).unwrap();
        let mut progress = Vec::new();
        let report = transport.fetch(|p| progress.push(p)).await.unwrap();

        mock.assert();
        assert_eq!(report.size, CONTENT.len() as u64);
        assert_eq!(report.bytes_transferred, CONTENT.len() as u64);
        assert_eq!(report.resumed_from, 0);
        assert_eq!(report.cache_tag.as_deref(), Some("\"abc\""));
        assert_eq!(report.hash, Some(blake3::hash(CONTENT).to_hex().to_string()));
        assert_eq!(tokio::fs::read(&report.destination).await.unwrap(), CONTENT);

        assert!(!progress.is_empty());
        assert!(progress
            .windows(2)
            .all(|pair| pair[0].bytes_so_far <= pair[1].bytes_so_far));
        assert_eq!(
            progress.last().unwrap().bytes_so_far,
            CONTENT.len() as u64
        );

        let events = download_events(&mut rx);
        assert!(matches!(events.first(), Some(DownloadEvent::Started { transport, .. }) if transport == "http"));
        assert!(matches!(events.last(), Some(DownloadEvent::Completed { .. })));
    }

    #[tokio::test]
    async fn test_resume_appends_remaining_bytes() {
        let server = MockServer::start();
        let resumed = server.mock(|when, then| {
            when.method(GET).path("/big.apk").header("range", "bytes=10-");
            then.status(206)
                .header("content-range", format!("bytes 10-{}/{}", CONTENT.len() - 1, CONTENT.len()))
                .body(&CONTENT[10..]);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("big.apk");
        tokio::fs::write(&dest, &CONTENT[..10]).await.unwrap();

        let factory = factory_in(temp.path(), Platform::headless());
        let mut transport = factory.build(&server.url("/big.apk"), Some(&dest)).unwrap();
        let mut first = None;
        let report = transport
            .fetch(|p| {
                first.get_or_insert(p);
            })
            .await
            .unwrap();

        resumed.assert();
        assert_eq!(report.resumed_from, 10);
        assert_eq!(report.bytes_transferred, (CONTENT.len() - 10) as u64);
        assert_eq!(report.size, CONTENT.len() as u64);
        assert_eq!(report.hash, Some(blake3::hash(CONTENT).to_hex().to_string()));
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), CONTENT);
        assert!(first.unwrap().bytes_so_far > 10);
        assert_eq!(first.unwrap().total_bytes, Some(CONTENT.len() as u64));
    }

    #[tokio::test]
    async fn test_full_response_replaces_partial_file() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/index.jar");
            then.status(200).body(CONTENT);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("index.jar");
        tokio::fs::write(&dest, b"stale partial data that is long")
            .await
            .unwrap();

        let report = download_file(
            &factory_in(temp.path(), Platform::headless()),
            &server.url("/index.jar"),
            Some(&dest),
        )
        .await
        .unwrap();

        assert_eq!(report.resumed_from, 0);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), CONTENT);
    }

    #[tokio::test]
    async fn test_unsatisfiable_range_restarts_once() {
        let server = MockServer::start();
        let ranged = server.mock(|when, then| {
            when.method(GET).path("/index.jar").header_exists("range");
            then.status(416);
        });
        let full = server.mock(|when, then| {
            when.method(GET).path("/index.jar").header_missing("range");
            then.status(200).body(CONTENT);
        });

        let temp = tempdir().unwrap();
        let dest = temp.path().join("index.jar");
        tokio::fs::write(&dest, vec![b'x'; CONTENT.len() + 5])
            .await
            .unwrap();

        let (tx, mut rx) = channel();
        let factory = factory_in(temp.path(), Platform::headless()).with_events(tx);
        let report = download_file(&factory, &server.url("/index.jar"), Some(&dest))
            .await
            .unwrap();

        ranged.assert_hits(1);
        full.assert_hits(1);
        assert_eq!(report.resumed_from, 0);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), CONTENT);

        let mut warned = false;
        while let Ok(message) = rx.try_recv() {
            if let AppEvent::General(GeneralEvent::Warning { context, .. }) = message.event {
                assert_eq!(context.as_deref(), Some("discarding 41 bytes"));
                warned = true;
            }
        }
        assert!(warned);
    }

    #[tokio::test]
    async fn test_not_found_is_only_a_status_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.apk");
            then.status(404);
        });

        let temp = tempdir().unwrap();
        let (tx, mut rx) = channel();
        let factory = factory_in(temp.path(), Platform::headless()).with_events(tx);

        let mut transport = factory.build(&server.url("/missing.apk"), None).unwrap();
        let mut progress_calls = 0;
        let err = transport.fetch(|_| progress_calls += 1).await.unwrap_err();

        assert_eq!(err.failure_kind(), FailureKind::HttpStatus(404));
        assert_eq!(progress_calls, 0);

        let events = download_events(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DownloadEvent::Failed { .. }));
    }

    #[tokio::test]
    async fn test_cache_tag_not_modified() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/index-v1.jar")
                .header("if-none-match", "\"v7\"");
            then.status(304).header("etag", "\"v7\"");
        });

        let temp = tempdir().unwrap();
        let (tx, mut rx) = channel();
        let factory = factory_in(temp.path(), Platform::headless()).with_events(tx);

        let mut transport = factory
            .build(&server.url("/index-v1.jar"), None)
            .unwrap()
            .with_cache_tag("\"v7\"");
        let report = transport.fetch(|_| {}).await.unwrap();

        mock.assert();
        assert!(report.not_modified);
        assert_eq!(report.cache_tag.as_deref(), Some("\"v7\""));
        assert_eq!(report.bytes_transferred, 0);
        assert!(report.hash.is_none());
        assert_eq!(std::fs::metadata(&report.destination).unwrap().len(), 0);

        let events = download_events(&mut rx);
        assert!(matches!(events.last(), Some(DownloadEvent::NotModified { .. })));
    }

    #[tokio::test]
    async fn test_checksum_mismatch_is_io_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/app.apk");
            then.status(200).body(CONTENT);
        });

        let temp = tempdir().unwrap();
        let factory = factory_in(temp.path(), Platform::headless());
        let mut transport = factory
            .build(&server.url("/app.apk"), None)
            .unwrap()
            .with_expected_hash(blake3::hash(b"something else").to_hex().to_string());

        let err = transport.fetch(|_| {}).await.unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::IoFailure);
        assert_eq!(std::fs::metadata(transport.destination()).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_fetch() {
        let temp = tempdir().unwrap();
        let factory = factory_in(temp.path(), Platform::headless());
        let mut transport = factory.build("https://f-droid.org/repo/index.jar", None).unwrap();

        transport.cancellation_token().cancel();
        let err = transport.fetch(|_| {}).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    // ---- overlay ----

    #[tokio::test]
    async fn test_overlay_requests_go_through_proxy() {
        let proxy = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let proxy_addr = proxy.local_addr().unwrap();
        let seen = tokio::spawn(async move {
            let (mut socket, _) = proxy.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let head = String::from_utf8_lossy(&buf[..n]).to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                CONTENT.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.write_all(CONTENT).await.unwrap();
            socket.shutdown().await.unwrap();
            head
        });

        let temp = tempdir().unwrap();
        let mut config = Config::default();
        config.paths.scratch_dir = Some(temp.path().to_path_buf());
        config.overlay.proxy_url = format!("http://{proxy_addr}");
        let factory = DownloaderFactory::new(&config, Platform::headless()).unwrap();

        let report = download_file(&factory, "http://fdroidexample.onion/repo/index.jar", None)
            .await
            .unwrap();

        let head = seen.await.unwrap();
        assert!(head.starts_with("GET http://fdroidexample.onion/repo/index.jar HTTP/1.1"));
        assert_eq!(report.kind, TransportKind::AnonymizedOverlayHttp);
        assert_eq!(tokio::fs::read(&report.destination).await.unwrap(), CONTENT);
    }

    #[tokio::test]
    async fn test_unreachable_proxy_is_transport_unavailable() {
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);

        let temp = tempdir().unwrap();
        let mut config = Config::default();
        config.paths.scratch_dir = Some(temp.path().to_path_buf());
        config.overlay.proxy_url = format!("http://{addr}");
        let factory = DownloaderFactory::new(&config, Platform::headless()).unwrap();

        let err = download_file(&factory, "http://fdroidexample.onion/repo/index.jar", None)
            .await
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::TransportUnavailable);
        assert!(err.failure_kind().is_transient());
    }

    // ---- short-range pairing ----

    struct FakeDevice {
        address: String,
        response: Vec<u8>,
        requests: Arc<Mutex<Vec<wire::Request>>>,
    }

    impl FakeDevice {
        async fn serving(head: ResponseHead, body: &[u8]) -> Self {
            let mut response = Vec::new();
            head.write_to(&mut response).await.unwrap();
            response.extend_from_slice(body);
            Self {
                address: "AA:BB:CC:DD:EE:FF".to_string(),
                response,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl PairingAdapter for FakeDevice {
        async fn connect(&self, address: &str) -> Result<Box<dyn PairingLink>, PlatformError> {
            if address != self.address {
                return Err(PlatformError::DeviceNotPaired {
                    address: address.to_string(),
                });
            }

            let (client, server) = tokio::io::duplex(64 * 1024);
            let response = self.response.clone();
            let requests = Arc::clone(&self.requests);
            tokio::spawn(async move {
                let mut server = BufReader::new(server);
                let request = wire::read_request(&mut server).await.unwrap();
                requests.lock().unwrap().push(request);
                let server = server.get_mut();
                server.write_all(&response).await.unwrap();
                server.shutdown().await.unwrap();
            });
            Ok(Box::new(client))
        }
    }

    #[tokio::test]
    async fn test_pairing_download_overwrites_destination() {
        let head = ResponseHead::new(200, "OK")
            .with_header("Content-Length", CONTENT.len().to_string());
        let device = FakeDevice::serving(head, CONTENT).await;
        let requests = Arc::clone(&device.requests);

        let temp = tempdir().unwrap();
        let dest = temp.path().join("index.jar");
        tokio::fs::write(&dest, b"left over from an earlier attempt, longer than the body")
            .await
            .unwrap();

        let factory = factory_in(
            temp.path(),
            Platform::headless().with_pairing(Arc::new(device)),
        );
        let mut transport = factory
            .build("bluetooth://AA-BB-CC-DD-EE-FF/fdroid/repo/index.jar", Some(&dest))
            .unwrap();
        let report = transport.fetch(|_| {}).await.unwrap();

        assert_eq!(report.kind, TransportKind::ShortRangePairing);
        assert_eq!(report.resumed_from, 0);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), CONTENT);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method(), wire::Method::Get);
        assert_eq!(requests[0].target(), "/fdroid/repo/index.jar");
    }

    #[tokio::test]
    async fn test_pairing_probe_size() {
        let head = ResponseHead::new(200, "OK").with_header("Content-Length", "4096");
        let device = FakeDevice::serving(head, b"").await;
        let requests = Arc::clone(&device.requests);

        let temp = tempdir().unwrap();
        let factory = factory_in(
            temp.path(),
            Platform::headless().with_pairing(Arc::new(device)),
        );
        let Transport::Pairing(transport) = factory
            .build("bluetooth://AA-BB-CC-DD-EE-FF/fdroid/repo/app.apk", None)
            .unwrap()
        else {
            panic!("expected pairing transport");
        };

        assert_eq!(transport.address(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(transport.probe_size().await.unwrap(), 4096);
        assert_eq!(requests.lock().unwrap()[0].method(), wire::Method::Head);
    }

    #[tokio::test]
    async fn test_unpaired_device_is_transport_unavailable() {
        let head = ResponseHead::new(200, "OK").with_header("Content-Length", "0");
        let device = FakeDevice::serving(head, b"").await;

        let temp = tempdir().unwrap();
        let factory = factory_in(
            temp.path(),
            Platform::headless().with_pairing(Arc::new(device)),
        );
        let err = download_file(&factory, "bluetooth://11-22-33-44-55-66/repo", None)
            .await
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::TransportUnavailable);

        let err = download_file(
            &factory_in(temp.path(), Platform::headless()),
            "bluetooth://AA-BB-CC-DD-EE-FF/repo",
            None,
        )
        .await
        .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::TransportUnavailable);
    }

    #[tokio::test]
    async fn test_pairing_truncated_body_is_io_failure() {
        let head = ResponseHead::new(200, "OK").with_header("Content-Length", "100");
        let device = FakeDevice::serving(head, &CONTENT[..10]).await;

        let temp = tempdir().unwrap();
        let factory = factory_in(
            temp.path(),
            Platform::headless().with_pairing(Arc::new(device)),
        );
        let err = download_file(&factory, "bluetooth://AA-BB-CC-DD-EE-FF/repo/app.apk", None)
            .await
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::IoFailure);
    }

    #[tokio::test]
    async fn test_pairing_status_failure() {
        let head = ResponseHead::new(404, "Not Found").with_header("Content-Length", "0");
        let device = FakeDevice::serving(head, b"").await;

        let temp = tempdir().unwrap();
        let factory = factory_in(
            temp.path(),
            Platform::headless().with_pairing(Arc::new(device)),
        );
        let err = download_file(&factory, "bluetooth://AA-BB-CC-DD-EE-FF/repo/gone.apk", None)
            .await
            .unwrap_err();
        assert_eq!(err.failure_kind(), FailureKind::HttpStatus(404));
    }

    // ---- async, in-process ----

    /// Serves the head and one chunk of a large body, then stalls
    async fn stalled_server() -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1048576\r\n\r\n")
                .await
                .unwrap();
            socket.write_all(&[7u8; 1024]).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        (format!("http://{addr}/stall.bin"), task)
    }

    #[tokio::test]
    async fn test_in_process_cancel_after_first_progress() {
        let (url, server) = stalled_server().await;
        let temp = tempdir().unwrap();
        let factory = factory_in(temp.path(), Platform::headless());

        let (listener, mut rx) = ChannelListener::new();
        let handle = factory
            .build_async(&url, None, DownloadRequest::new("stall", "test.stall"), listener)
            .unwrap();
        assert!(!handle.is_native());

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ListenerEvent::Progress(_)));

        handle.cancel();
        assert_eq!(handle.wait().await, SessionState::Cancelled);

        let rest = drain_listener(&mut rx).await;
        let results: Vec<_> = rest
            .iter()
            .filter(|event| matches!(event, ListenerEvent::Result(_)))
            .collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(rest.last(), Some(ListenerEvent::Result(TerminalOutcome::Cancelled))));
        assert!(rest.iter().all(|event| match event {
            ListenerEvent::Progress(p) => p.bytes_so_far <= 1024,
            ListenerEvent::Result(_) => true,
        }));

        server.abort();
    }

    #[tokio::test]
    async fn test_in_process_failure_reaches_listener_once() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/missing.apk");
            then.status(404);
        });

        let temp = tempdir().unwrap();
        let factory = factory_in(temp.path(), Platform::headless());
        let (listener, mut rx) = ChannelListener::new();
        let handle = factory
            .build_async(
                &server.url("/missing.apk"),
                None,
                DownloadRequest::new("Missing", "org.example.missing"),
                listener,
            )
            .unwrap();

        assert_eq!(handle.wait().await, SessionState::Failed);
        let events = drain_listener(&mut rx).await;
        assert_eq!(events.len(), 1);
        let ListenerEvent::Result(outcome) = &events[0] else {
            panic!("expected a terminal outcome");
        };
        assert_eq!(outcome.failure_kind(), Some(FailureKind::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_gate_below_threshold_runs_in_process() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/index.jar");
            then.status(200).body(CONTENT);
        });

        let service = Arc::new(ScriptedNative::new(vec![]));
        let temp = tempdir().unwrap();
        let platform = Platform::headless().with_native_downloads(
            MIN_NATIVE_DOWNLOAD_VERSION - 1,
            Arc::clone(&service) as Arc<dyn NativeDownloadService>,
        );
        let factory = factory_in(temp.path(), platform);

        let (listener, mut rx) = ChannelListener::new();
        let handle = factory
            .build_async(
                &server.url("/index.jar"),
                None,
                DownloadRequest::new("Index", "repo.index"),
                listener,
            )
            .unwrap();

        assert!(!handle.is_native());
        assert_eq!(handle.wait().await, SessionState::Succeeded);
        assert!(service.submitted.lock().unwrap().is_empty());

        let events = drain_listener(&mut rx).await;
        assert!(matches!(
            events.last(),
            Some(ListenerEvent::Result(TerminalOutcome::Success(_)))
        ));
        assert_eq!(tokio::fs::read(handle.destination()).await.unwrap(), CONTENT);
    }

    // ---- async, native delegate ----

    struct ScriptedNative {
        script: Mutex<VecDeque<NativeDownloadStatus>>,
        submitted: Mutex<Vec<NativeDownloadRequest>>,
        cancelled: Mutex<Vec<NativeDownloadId>>,
        /// Every query fails as if the facility lost the download
        forgetful: bool,
    }

    impl ScriptedNative {
        fn new(script: Vec<NativeDownloadStatus>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                submitted: Mutex::new(Vec::new()),
                cancelled: Mutex::new(Vec::new()),
                forgetful: false,
            }
        }

        fn forgetful() -> Self {
            Self {
                forgetful: true,
                ..Self::new(vec![])
            }
        }
    }

    fn status(state: NativeDownloadState, bytes_so_far: u64) -> NativeDownloadStatus {
        NativeDownloadStatus {
            state,
            bytes_so_far,
            total_bytes: Some(100),
        }
    }

    #[async_trait]
    impl NativeDownloadService for ScriptedNative {
        async fn submit(
            &self,
            request: NativeDownloadRequest,
        ) -> Result<NativeDownloadId, PlatformError> {
            self.submitted.lock().unwrap().push(request);
            Ok(NativeDownloadId(42))
        }

        async fn query(&self, id: NativeDownloadId) -> Result<NativeDownloadStatus, PlatformError> {
            assert_eq!(id, NativeDownloadId(42));
            if self.forgetful {
                return Err(PlatformError::UnknownNativeDownload { id: id.0 });
            }
            let mut script = self.script.lock().unwrap();
            // The last scripted status repeats forever
            if script.len() > 1 {
                Ok(script.pop_front().unwrap())
            } else {
                Ok(*script.front().unwrap())
            }
        }

        async fn cancel(&self, id: NativeDownloadId) -> Result<(), PlatformError> {
            self.cancelled.lock().unwrap().push(id);
            Ok(())
        }
    }

    fn native_factory(dir: &Path, service: &Arc<ScriptedNative>) -> DownloaderFactory {
        let platform = Platform::headless().with_native_downloads(
            21,
            Arc::clone(service) as Arc<dyn NativeDownloadService>,
        );
        factory_in(dir, platform).with_native_poll_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_native_delegate_success() {
        let service = Arc::new(ScriptedNative::new(vec![
            status(NativeDownloadState::Pending, 0),
            status(NativeDownloadState::Running, 40),
            status(NativeDownloadState::Running, 30),
            status(NativeDownloadState::Running, 80),
            status(NativeDownloadState::Successful, 100),
        ]));
        let temp = tempdir().unwrap();
        let (tx, mut events_rx) = channel();
        let factory = native_factory(temp.path(), &service).with_events(tx);

        let (listener, mut rx) = ChannelListener::new();
        let handle = factory
            .build_async(
                "https://f-droid.org/repo/org.fdroid.fdroid.apk",
                None,
                DownloadRequest::new("F-Droid", "org.fdroid.fdroid"),
                listener,
            )
            .unwrap();

        assert!(handle.is_native());
        assert_eq!(handle.wait().await, SessionState::Succeeded);

        let submitted = service.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].title, "F-Droid");
        assert_eq!(submitted[0].id, "org.fdroid.fdroid");
        assert_eq!(submitted[0].destination, handle.destination());

        let events = drain_listener(&mut rx).await;
        let progress: Vec<u64> = events
            .iter()
            .filter_map(|event| match event {
                ListenerEvent::Progress(p) => Some(p.bytes_so_far),
                ListenerEvent::Result(_) => None,
            })
            .collect();
        assert_eq!(progress, vec![40, 80, 100]);
        assert!(matches!(
            events.last(),
            Some(ListenerEvent::Result(TerminalOutcome::Success(report))) if report.size == 100
        ));

        let app_events: Vec<_> = std::iter::from_fn(|| events_rx.try_recv().ok()).collect();
        assert!(app_events.iter().any(|message| matches!(
            message.event,
            AppEvent::Download(DownloadEvent::DelegatedToNative { native_id: 42, .. })
        )));
        assert!(app_events
            .iter()
            .all(|message| message.meta.correlation_id.as_deref() == Some("org.fdroid.fdroid")));
    }

    #[tokio::test]
    async fn test_native_delegate_http_failure() {
        let service = Arc::new(ScriptedNative::new(vec![
            status(NativeDownloadState::Running, 10),
            status(NativeDownloadState::Failed { reason: 404 }, 10),
        ]));
        let temp = tempdir().unwrap();
        let factory = native_factory(temp.path(), &service);

        let (listener, mut rx) = ChannelListener::new();
        let handle = factory
            .build_async(
                "https://f-droid.org/repo/gone.apk",
                None,
                DownloadRequest::new("Gone", "org.example.gone"),
                listener,
            )
            .unwrap();

        assert_eq!(handle.wait().await, SessionState::Failed);
        let events = drain_listener(&mut rx).await;
        let Some(ListenerEvent::Result(outcome)) = events.last() else {
            panic!("expected a terminal outcome");
        };
        assert_eq!(outcome.failure_kind(), Some(FailureKind::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_native_delegate_cancel() {
        let service = Arc::new(ScriptedNative::new(vec![status(
            NativeDownloadState::Running,
            5,
        )]));
        let temp = tempdir().unwrap();
        let factory = native_factory(temp.path(), &service);

        let (listener, mut rx) = ChannelListener::new();
        let handle = factory
            .build_async(
                "https://f-droid.org/repo/slow.apk",
                None,
                DownloadRequest::new("Slow", "org.example.slow"),
                listener,
            )
            .unwrap();

        assert!(matches!(rx.recv().await, Some(ListenerEvent::Progress(_))));
        handle.cancel();
        assert_eq!(handle.wait().await, SessionState::Cancelled);
        assert_eq!(
            service.cancelled.lock().unwrap().as_slice(),
            &[NativeDownloadId(42)]
        );

        let rest = drain_listener(&mut rx).await;
        assert!(matches!(
            rest.last(),
            Some(ListenerEvent::Result(TerminalOutcome::Cancelled))
        ));
        assert_eq!(
            rest.iter()
                .filter(|event| matches!(event, ListenerEvent::Result(_)))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_native_query_failure_withdraws_download() {
        let service = Arc::new(ScriptedNative::forgetful());
        let temp = tempdir().unwrap();
        let factory = native_factory(temp.path(), &service);

        let (listener, mut rx) = ChannelListener::new();
        let handle = factory
            .build_async(
                "https://f-droid.org/repo/lost.apk",
                None,
                DownloadRequest::new("Lost", "org.example.lost"),
                listener,
            )
            .unwrap();

        assert_eq!(handle.wait().await, SessionState::Failed);
        assert_eq!(
            service.cancelled.lock().unwrap().as_slice(),
            &[NativeDownloadId(42)]
        );

        let events = drain_listener(&mut rx).await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            ListenerEvent::Result(TerminalOutcome::Failure(err)) => {
                assert_eq!(err.failure_kind(), FailureKind::IoFailure);
            }
            other => panic!("unexpected listener event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_overlay_never_delegated() {
        let service = Arc::new(ScriptedNative::new(vec![status(
            NativeDownloadState::Successful,
            100,
        )]));
        let temp = tempdir().unwrap();
        let factory = native_factory(temp.path(), &service);

        let (listener, _rx) = ChannelListener::new();
        let handle = factory
            .build_async(
                "http://fdroidexample.onion/repo/index.jar",
                None,
                DownloadRequest::new("Index", "repo.index"),
                listener,
            )
            .unwrap();

        assert!(!handle.is_native());
        handle.cancel();
        handle.wait().await;
        assert!(service.submitted.lock().unwrap().is_empty());
    }
}
