// Integration tests for the archive fetcher.
// A local HTTP server stands in for the repository host.

mod support;

use submission_archiver::contract::Downloader;
use submission_archiver::download::ArchiveDownloader;
use submission_archiver::error::FetchError;
use support::CannedResponse;
use tempfile::tempdir;

const ARCHIVE_BYTES: &[u8] = b"PK\x03\x04 fake zip contents";

#[tokio::test]
async fn test_fetch_archive_writes_named_zip_to_scratch() {
    let server = support::spawn(|request| {
        if request.path() == "/org/repo/archive/main.zip" {
            CannedResponse::ok("application/zip", ARCHIVE_BYTES)
        } else {
            CannedResponse::status(404, "no such archive")
        }
    })
    .await;
    let scratch = tempdir().unwrap();
    let downloader = ArchiveDownloader::new(reqwest::Client::new(), scratch.path());

    let repository_url = format!("{}/org/repo", server.base_url);
    let archive = downloader
        .fetch_archive(&repository_url, "a@b.com")
        .await
        .expect("fetch should succeed");

    assert_eq!(archive.repository_name, "repo");
    assert_eq!(archive.archive_url, format!("{repository_url}/archive/main.zip"));
    assert_eq!(archive.local_path, scratch.path().join("repo-main.zip"));
    assert_eq!(archive.size_bytes, ARCHIVE_BYTES.len() as u64);
    assert_eq!(
        std::fs::read(&archive.local_path).unwrap(),
        ARCHIVE_BYTES,
        "scratch file should hold exactly the served bytes"
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 1, "archive should be fetched exactly once");
    assert_eq!(requests[0].method, "GET");
}

#[tokio::test]
async fn test_fetch_archive_creates_missing_scratch_dir() {
    let server =
        support::spawn(|_| CannedResponse::ok("application/zip", ARCHIVE_BYTES)).await;
    let root = tempdir().unwrap();
    let scratch = root.path().join("nested").join("scratch");
    let downloader = ArchiveDownloader::new(reqwest::Client::new(), &scratch);

    let archive = downloader
        .fetch_archive(&format!("{}/org/project.git", server.base_url), "a@b.com")
        .await
        .expect("fetch should succeed");

    assert_eq!(archive.local_path, scratch.join("project-main.zip"));
    assert!(archive.local_path.exists());
}

#[tokio::test]
async fn test_fetch_archive_error_status_is_not_written() {
    struct TestCase {
        name: &'static str,
        status: u16,
    }

    let cases = vec![
        TestCase { name: "missing branch", status: 404 },
        TestCase { name: "host failure", status: 500 },
    ];

    for tc in cases {
        let status = tc.status;
        let server = support::spawn(move |_| CannedResponse::status(status, "nope")).await;
        let scratch = tempdir().unwrap();
        let downloader = ArchiveDownloader::new(reqwest::Client::new(), scratch.path());

        let err = downloader
            .fetch_archive(&format!("{}/org/repo", server.base_url), "a@b.com")
            .await
            .unwrap_err();

        match err {
            FetchError::Status { status, .. } => assert_eq!(status, tc.status, "{}", tc.name),
            other => panic!("{}: expected Status error, got {other:?}", tc.name),
        }
        assert!(
            !scratch.path().join("repo-main.zip").exists(),
            "{}: nothing should be written on failure",
            tc.name
        );
    }
}

#[tokio::test]
async fn test_fetch_archive_rejects_unparseable_url_without_request() {
    let scratch = tempdir().unwrap();
    let downloader = ArchiveDownloader::new(reqwest::Client::new(), scratch.path());

    let err = downloader
        .fetch_archive("not a repository", "a@b.com")
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::InvalidUrl { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_archive_unreachable_host_is_request_error() {
    // Bind then drop a listener so the port is very likely closed.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let scratch = tempdir().unwrap();
    let downloader = ArchiveDownloader::new(reqwest::Client::new(), scratch.path());

    let err = downloader
        .fetch_archive(&format!("http://127.0.0.1:{port}/org/repo"), "a@b.com")
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Request { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_fetch_archive_streams_large_body_to_disk() {
    // Several MiB so the body arrives over many chunks.
    let large: Vec<u8> = (0..3 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
    let served = large.clone();
    let server =
        support::spawn(move |_| CannedResponse::ok("application/zip", served.clone())).await;
    let scratch = tempdir().unwrap();
    let downloader = ArchiveDownloader::new(reqwest::Client::new(), scratch.path());

    let archive = downloader
        .fetch_archive(&format!("{}/org/big-repo", server.base_url), "a@b.com")
        .await
        .expect("fetch should succeed");

    assert_eq!(archive.size_bytes, large.len() as u64, "size is the count of bytes written");
    let on_disk = std::fs::read(&archive.local_path).unwrap();
    assert_eq!(on_disk.len(), large.len());
    assert!(on_disk == large, "scratch file should hold every chunk in order");
}

#[tokio::test]
async fn test_fetch_archive_accepts_uppercase_scheme() {
    let server =
        support::spawn(|_| CannedResponse::ok("application/zip", ARCHIVE_BYTES)).await;
    let scratch = tempdir().unwrap();
    let downloader = ArchiveDownloader::new(reqwest::Client::new(), scratch.path());

    let upper = server.base_url.replacen("http://", "HTTP://", 1);
    let archive = downloader
        .fetch_archive(&format!("{upper}/org/repo"), "a@b.com")
        .await
        .expect("scheme case should not matter");
    assert_eq!(archive.repository_name, "repo");
}
