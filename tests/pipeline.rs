use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gfascope::bookmarks::Bookmark;
use gfascope::bus::{Event, Subscription};
use gfascope::cache::{MetadataError, MetadataSource};
use gfascope::config::ViewerConfig;
use gfascope::context::AppContext;
use gfascope::genome_index::GenomePoint;
use gfascope::gfa::{GfaMetadataReader, load_gfa};
use gfascope::model::{ByteOffset, HasMetadata, NodeId, NodeMetadata, Subgraph};
use gfascope::session::Session;
use gfascope::store::FsStore;
use indexmap::IndexMap;
use tempfile::TempDir;

const GFA: &str = "H\tVN:Z:1.0\n\
S\ts1\tACGT\n\
S\ts2\tG\n\
S\ts3\tTTAA\n\
S\ts4\tCC\n\
S\ts5\tA\n\
L\ts1\t+\ts2\t+\t0M\n\
L\ts2\t+\ts3\t+\t0M\n\
L\ts1\t+\ts3\t+\t0M\n\
L\ts3\t+\ts4\t+\t0M\n\
L\ts4\t+\ts5\t+\t0M\n\
P\tg1\ts1+,s2+,s3+,s4+\t*\n\
P\tg2\ts1+,s3+\t*\n";

struct Fixture {
    dir: TempDir,
    gfa: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let gfa = dir.path().join("sample.gfa");
        fs::write(&gfa, GFA).unwrap();
        Self { dir, gfa }
    }

    fn context(&self, config: ViewerConfig) -> AppContext {
        AppContext::new(config, Arc::new(FsStore::new(self.dir.path().join("data"))))
    }
}

fn fast_config() -> ViewerConfig {
    ViewerConfig {
        throttle_interval_ms: 0,
        ..ViewerConfig::default()
    }
}

fn next_enriched(subscription: &Subscription) -> Arc<Subgraph> {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match subscription.events.recv_timeout(remaining) {
            Ok(Event::MetadataCacheUpdated(subgraph)) => return subgraph,
            Ok(_) => continue,
            Err(error) => panic!("no enriched window: {error}"),
        }
    }
}

fn genomes_of(subgraph: &Subgraph, id: NodeId) -> Vec<String> {
    subgraph
        .node(id)
        .and_then(|node| node.genomes())
        .map(|genomes| genomes.iter().cloned().collect())
        .unwrap_or_default()
}

#[test]
fn navigation_enriches_the_visible_window() {
    let fixture = Fixture::new();
    let mut session = Session::open(fixture.context(fast_config()), &fixture.gfa).unwrap();
    let updates = session.subscribe();
    let s1 = session.node_by_name("s1").unwrap();

    let window = session.navigate(s1, 1).unwrap();
    assert_eq!(window.node_ids().collect::<Vec<_>>(), [0, 1, 2]);

    let enriched = next_enriched(&updates);
    assert_eq!(enriched.center(), Some(s1));
    assert!(enriched.nodes().all(|node| node.has_metadata()));
    let s3 = enriched.node(2).unwrap().metadata().unwrap().unwrap();
    assert_eq!(s3.name(), "s3");
    assert_eq!(s3.sequence(), "TTAA");
    assert_eq!(genomes_of(&enriched, s1), ["g1", "g2"]);
    assert_eq!(genomes_of(&enriched, 1), ["g1"]);

    let shortcut = enriched
        .edges()
        .find(|edge| edge.source() == 0 && edge.target() == 2)
        .unwrap();
    assert_eq!(enriched.edge_importance(shortcut.id()), Some(1));
    assert_eq!(session.cache().len(), 3);
}

#[test]
fn coordinates_resolve_after_indexing() {
    let fixture = Fixture::new();
    let mut session = Session::open(fixture.context(fast_config()), &fixture.gfa).unwrap();

    assert!(session.go_to("g1", 0, 1).is_none());

    session.index().populate_index("g1").unwrap();
    session.settle();

    let (point, window) = session.go_to("g1", 4, 1).unwrap();
    assert_eq!(point, GenomePoint { node_id: 1, offset: 0 });
    assert_eq!(window.center(), Some(1));

    let (point, _) = session.go_to("g1", 5, 1).unwrap();
    assert_eq!(point, GenomePoint { node_id: 2, offset: 0 });
    assert_eq!(session.query().center(), Some(2));

    assert!(session.go_to("g1", 11, 1).is_none());
    assert!(session.go_to("g2", 0, 1).is_none());
    assert_eq!(session.index().get_base("g1", 3), Some(9));
}

#[test]
fn index_and_bookmarks_persist_across_sessions() {
    let fixture = Fixture::new();
    {
        let mut session = Session::open(fixture.context(fast_config()), &fixture.gfa).unwrap();
        session.index().populate_index("g2").unwrap();
        session.settle();
        session
            .bookmarks_mut()
            .add(Bookmark {
                center: 2,
                radius: 3,
                description: "bubble".into(),
            })
            .unwrap();
    }

    let session = Session::open(fixture.context(fast_config()), &fixture.gfa).unwrap();

    assert!(session.index().is_indexed("g2"));
    assert_eq!(session.index().get_genome_point("g2", 4).unwrap().node_id, 2);
    assert_eq!(session.bookmarks().list().len(), 1);
    assert_eq!(session.bookmarks().list()[0].description, "bubble");
}

#[test]
fn node_input_resolves_names_before_ids() {
    let fixture = Fixture::new();
    let session = Session::open(fixture.context(fast_config()), &fixture.gfa).unwrap();

    assert_eq!(session.resolve_node(" s4 "), Some(3));
    assert_eq!(session.resolve_node("4"), Some(4));
    assert_eq!(session.resolve_node("99"), None);
    assert_eq!(session.resolve_node("nope"), None);
}

#[test]
fn unknown_center_is_reported_without_publishing() {
    let fixture = Fixture::new();
    let mut session = Session::open(fixture.context(fast_config()), &fixture.gfa).unwrap();
    let updates = session.subscribe();

    assert!(session.navigate(42, 1).is_err());
    assert!(updates.events.try_recv().is_err());
}

struct CountingSource {
    inner: GfaMetadataReader,
    calls: Mutex<Vec<Vec<NodeId>>>,
}

impl MetadataSource for CountingSource {
    fn parse_node_metadata(
        &self,
        requests: &IndexMap<NodeId, ByteOffset>,
    ) -> Result<HashMap<NodeId, NodeMetadata>, MetadataError> {
        self.calls
            .lock()
            .unwrap()
            .push(requests.keys().copied().collect());
        self.inner.parse_node_metadata(requests)
    }
}

fn counting_session(fixture: &Fixture, config: ViewerConfig) -> (Session, Arc<CountingSource>) {
    let source = Arc::new(CountingSource {
        inner: GfaMetadataReader::new(&fixture.gfa),
        calls: Mutex::default(),
    });
    let graph = Arc::new(load_gfa(&fixture.gfa).unwrap());
    let session = Session::from_graph(
        fixture.context(config),
        graph,
        Arc::clone(&source) as Arc<dyn MetadataSource>,
    )
    .unwrap();
    (session, source)
}

#[test]
fn wide_windows_skip_metadata_retrieval() {
    let fixture = Fixture::new();
    let config = ViewerConfig {
        radius_threshold: 2,
        ..fast_config()
    };
    let (mut session, source) = counting_session(&fixture, config);
    let updates = session.subscribe();

    session.navigate(0, 5).unwrap();
    session.navigate(4, 1).unwrap();

    let enriched = next_enriched(&updates);
    assert_eq!(enriched.center(), Some(4));
    assert_eq!(enriched.radius(), 1);
    assert_eq!(*source.calls.lock().unwrap(), [vec![3, 4]]);
}

#[test]
fn revisiting_a_window_fetches_nothing_new() {
    let fixture = Fixture::new();
    let (mut session, source) = counting_session(&fixture, fast_config());
    let updates = session.subscribe();

    session.navigate(1, 1).unwrap();
    next_enriched(&updates);
    session.navigate(1, 1).unwrap();
    let enriched = next_enriched(&updates);

    assert!(enriched.nodes().all(|node| node.has_metadata()));
    assert_eq!(source.calls.lock().unwrap().len(), 1);
}
