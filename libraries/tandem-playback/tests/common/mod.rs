//! Shared fakes and helpers for player integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use mockall::mock;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use tandem_core::{
    BackendKind, BackendResolver, ErrorClass, LocalCache, PersistedQueue, PersistenceStore,
    PlaybackSink, QualityPreference, Resolution, Result, TandemError, Track,
};
use tandem_playback::{PlaybackConfig, Player, PlayerDeps, PlayerHandle, PlayerSnapshot};
use tokio::sync::watch;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ===== Sink =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Prepare { url: String, cache_key: String },
    Play,
    Pause,
    Seek(u64),
    Stop,
}

/// Sink that records every call
#[derive(Default)]
pub struct RecordingSink {
    calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    /// URLs handed to `prepare`, in order
    pub fn prepared_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Prepare { url, .. } => Some(url),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: SinkCall) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl PlaybackSink for RecordingSink {
    fn prepare(&self, url: &str, cache_key: &str) -> Result<()> {
        self.record(SinkCall::Prepare {
            url: url.to_string(),
            cache_key: cache_key.to_string(),
        })
    }

    fn play(&self) -> Result<()> {
        self.record(SinkCall::Play)
    }

    fn pause(&self) -> Result<()> {
        self.record(SinkCall::Pause)
    }

    fn seek(&self, position_ms: u64) -> Result<()> {
        self.record(SinkCall::Seek(position_ms))
    }

    fn stop(&self) -> Result<()> {
        self.record(SinkCall::Stop)
    }
}

// ===== Resolver =====

/// What the scripted resolver answers for a track id
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Ok,
    Auth,
    Fail(ErrorClass),
    Transport,
    Slow(Duration),
}

/// Netease resolver answering from a per-id script (default: success)
#[derive(Default)]
pub struct ScriptedResolver {
    scripts: Mutex<HashMap<i64, Script>>,
    fallback: Mutex<Option<Script>>,
    calls: Mutex<Vec<i64>>,
}

impl ScriptedResolver {
    pub fn set(&self, id: i64, script: Script) {
        self.scripts.lock().unwrap().insert(id, script);
    }

    /// Script for ids without an explicit entry
    pub fn set_default(&self, script: Script) {
        *self.fallback.lock().unwrap() = Some(script);
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }
}

pub fn url_for(id: i64) -> String {
    format!("https://cdn.example/{id}.mp3")
}

#[async_trait]
impl BackendResolver for ScriptedResolver {
    fn backend(&self) -> BackendKind {
        BackendKind::Netease
    }

    async fn resolve(&self, track: &Track, quality: &QualityPreference) -> Result<Resolution> {
        self.calls.lock().unwrap().push(track.id);
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(&track.id)
            .copied()
            .or(*self.fallback.lock().unwrap())
            .unwrap_or(Script::Ok);

        let success = Resolution::Success {
            url: url_for(track.id),
            mime: Some("audio/mpeg".to_string()),
            cache_key: tandem_core::cache_key(track, quality),
        };

        match script {
            Script::Ok => Ok(success),
            Script::Auth => Ok(Resolution::RequiresAuthentication),
            Script::Fail(class) => Ok(Resolution::failure(class, "scripted failure")),
            Script::Transport => Err(TandemError::network("connection refused")),
            Script::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(success)
            }
        }
    }
}

// ===== Store and cache =====

mock! {
    pub Store {}

    #[async_trait]
    impl PersistenceStore for Store {
        async fn save(&self, snapshot: &PersistedQueue) -> Result<()>;
        async fn load(&self) -> Result<Option<PersistedQueue>>;
    }
}

mock! {
    pub Cache {}

    #[async_trait]
    impl LocalCache for Cache {
        async fn locate(&self, track: &Track) -> Option<PathBuf>;
    }
}

/// In-memory store remembering the last saved snapshot
#[derive(Default)]
pub struct MemoryStore {
    pub saved: Mutex<Option<PersistedQueue>>,
}

#[async_trait]
impl PersistenceStore for MemoryStore {
    async fn save(&self, snapshot: &PersistedQueue) -> Result<()> {
        *self.saved.lock().unwrap() = Some(snapshot.clone()).filter(|s| !s.is_empty());
        Ok(())
    }

    async fn load(&self) -> Result<Option<PersistedQueue>> {
        Ok(self.saved.lock().unwrap().clone())
    }
}

pub fn empty_cache() -> Arc<dyn LocalCache> {
    let mut cache = MockCache::new();
    cache.expect_locate().returning(|_| None);
    Arc::new(cache)
}

// ===== Tracks =====

pub fn track(id: i64) -> Track {
    Track::new(id, format!("Track {id}"), "Artist", "Album")
        .with_duration(Duration::from_secs(180))
}

pub fn tracks(ids: std::ops::RangeInclusive<i64>) -> Vec<Track> {
    ids.map(track).collect()
}

// ===== Player =====

pub struct Harness {
    pub player: Player,
    pub handle: PlayerHandle,
    pub sink: Arc<RecordingSink>,
    pub resolver: Arc<ScriptedResolver>,
}

pub async fn start_with_store(
    store: Arc<dyn PersistenceStore>,
    config: PlaybackConfig,
) -> Harness {
    init_tracing();

    let sink = Arc::new(RecordingSink::default());
    let resolver = Arc::new(ScriptedResolver::default());
    let player = Player::start(
        PlayerDeps {
            sink: sink.clone(),
            cache: empty_cache(),
            resolvers: vec![resolver.clone() as Arc<dyn BackendResolver>],
            store,
            shuffle_seed: Some(42),
        },
        config,
    )
    .await
    .expect("player should start");

    let handle = player.handle();
    Harness {
        player,
        handle,
        sink,
        resolver,
    }
}

pub async fn start(config: PlaybackConfig) -> Harness {
    start_with_store(Arc::new(MemoryStore::default()), config).await
}

/// Wait until the published state satisfies `pred`
pub async fn wait_for(
    rx: &mut watch::Receiver<PlayerSnapshot>,
    pred: impl FnMut(&PlayerSnapshot) -> bool,
) -> PlayerSnapshot {
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(pred))
        .await
        .expect("timed out waiting for player state")
        .expect("player stopped")
        .clone()
}

/// Let the actor drain its queue
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

/// Poll `cond` until it holds
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Next event, failing the test after a timeout
pub async fn next_event(
    rx: &mut tokio::sync::broadcast::Receiver<tandem_playback::PlayerEvent>,
) -> tandem_playback::PlayerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

pub fn queue_ids(snapshot: &PlayerSnapshot) -> Vec<i64> {
    snapshot.queue.iter().map(|t| t.id).collect()
}
