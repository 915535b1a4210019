use std::env;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use env_logger::Env;
use keepwatch::configuration::types::CaptureConfig;
use keepwatch::data_capture::{
    CaptureOpener, CaptureSession, FieldExtractor, FindingBuilder, FrameRead, FrameSource,
    KeywordMatcher, RawFrame,
};
use keepwatch::error_handling::types::CaptureError;
use keepwatch::network::NetworkInterface;
use keepwatch::storage::database_storage::DatabaseStorage;
use keepwatch::storage::file_storage::FileStorage;
use keepwatch::storage::finding_filter::by_host;
use keepwatch::storage::storage_trait::Storage;
use log::info;
use tokio_util::sync::CancellationToken;

const TRAFFIC: &[&str] = &[
    "GET /forum/bad-thread HTTP/1.1\r\nHost: forum.example\r\nReferer: http://search.example/?q=bad\r\n\r\n",
    "GET /news HTTP/1.1\r\nHost: news.example\r\n\r\n",
    "GET /forum/bad-thread HTTP/1.1\r\nHost: forum.example\r\nReferer: http://search.example/?q=bad\r\n\r\n",
    "GET /wiki/bad HTTP/1.1\r\nHost: intranet.local\r\n\r\n",
    "POST /chat HTTP/1.1\r\nHost: chat.example\r\n\r\nsomething worse",
];

/// Replays `TRAFFIC` as if it had been captured live.
struct ReplayOpener;

struct ReplaySource {
    next: usize,
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<FrameRead, CaptureError> {
        let Some(payload) = TRAFFIC.get(self.next) else {
            return Ok(FrameRead::EndOfCapture);
        };
        self.next += 1;
        Ok(FrameRead::Frame(RawFrame {
            data: payload.as_bytes().to_vec(),
            timestamp: Utc::now(),
        }))
    }
}

impl CaptureOpener for ReplayOpener {
    fn open(
        &self,
        _interface: &NetworkInterface,
        _settings: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>, CaptureError> {
        Ok(Box::new(ReplaySource { next: 0 }))
    }
}

fn main() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info")).try_init();

    let out_dir: PathBuf = env::var("KEEPWATCH_DEMO_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            env::current_dir()
                .expect("cwd")
                .join("target")
                .join("pipeline_demo")
        });
    fs::create_dir_all(&out_dir).expect("create output dir");

    let storage_db =
        DatabaseStorage::new_file(out_dir.join("pipeline_demo.sqlite3")).expect("create db");
    let storage_fs = FileStorage::new(&out_dir).expect("create file storage");

    let interface = NetworkInterface {
        name: "replay0".into(),
        description: Some("canned traffic".into()),
        addresses: vec![IpAddr::V4(Ipv4Addr::new(192, 168, 0, 2))],
    };
    let matcher = KeywordMatcher::new(vec!["bad".into(), "worse".into()])
        .with_ignored_sites(vec!["intranet.local".into()]);

    for storage in [&storage_db as &dyn Storage, &storage_fs as &dyn Storage] {
        let session = CaptureSession::new(
            CaptureConfig::default(),
            matcher.clone(),
            FindingBuilder::new(FieldExtractor::new()),
            Arc::new(ReplayOpener),
            CancellationToken::new(),
        );
        let saved = session
            .run_to_sink(Some(&interface), storage)
            .expect("run session");
        info!("[{}] {} finding(s) saved", session.id(), saved);
    }

    let all_db = storage_db.get_findings(None).expect("list findings db");
    let all_fs = storage_fs.get_findings(None).expect("list findings fs");
    info!("Total findings -> DB: {}, FS: {}", all_db.len(), all_fs.len());

    for finding in storage_db
        .get_findings(Some(by_host("forum.example")))
        .expect("filter findings")
    {
        info!("{}", serde_json::to_string(&finding).expect("serialize finding"));
    }

    info!("Demo complete. Inspect files under: {}", out_dir.display());
}
