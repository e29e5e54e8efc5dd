use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use eframe::egui::{self, Context};
use fuzzy_matcher::skim::SkimMatcherV2;
use gfascope::bus::{Event, Subscription};
use gfascope::context::AppContext;
use gfascope::model::{NodeId, Subgraph};
use gfascope::session::Session;

mod ui;

/// What the command line asked for before the file is loaded.
#[derive(Clone, Debug)]
pub struct StartOptions {
    pub path: PathBuf,
    pub center: Option<String>,
    pub radius: Option<usize>,
    pub genome: Option<String>,
}

pub struct GfaScopeApp {
    context: AppContext,
    start: StartOptions,
    state: AppState,
}

enum AppState {
    Loading { rx: Receiver<Result<Session, String>> },
    Ready(Box<ViewModel>),
    Error(String),
}

struct ViewModel {
    session: Session,
    updates: Subscription,
    matcher: SkimMatcherV2,
    center_input: String,
    radius: usize,
    window: Option<Arc<Subgraph>>,
    enriched: bool,
    genome_filter: String,
    selected_genome: Option<String>,
    base_input: String,
    bookmark_description: String,
    status: Option<String>,
}

impl GfaScopeApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, context: AppContext, start: StartOptions) -> Self {
        let state = Self::start_load(&context, &start);
        Self {
            context,
            start,
            state,
        }
    }

    fn spawn_load(context: AppContext, path: PathBuf) -> Receiver<Result<Session, String>> {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = Session::open(context, &path).map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        rx
    }

    fn start_load(context: &AppContext, start: &StartOptions) -> AppState {
        AppState::Loading {
            rx: Self::spawn_load(context.clone(), start.path.clone()),
        }
    }
}

/// Takes the loader's answer once it arrives. A loader that went away without
/// answering counts as a failed load.
fn poll_load<T>(rx: &Receiver<Result<T, String>>) -> Option<Result<T, String>> {
    match rx.try_recv() {
        Ok(result) => Some(result),
        Err(TryRecvError::Empty) => None,
        Err(TryRecvError::Disconnected) => {
            Some(Err("the loader stopped before opening the graph".to_owned()))
        }
    }
}

impl eframe::App for GfaScopeApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Some(result) = poll_load(rx) {
                    transition = Some(match result {
                        Ok(session) => {
                            AppState::Ready(Box::new(ViewModel::new(session, &self.start)))
                        }
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading(format!("Loading {}...", self.start.path.display()));
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
                ctx.request_repaint_after(Duration::from_millis(100));
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to open assembly graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.context, &self.start));
                    }
                });
            }
            AppState::Ready(model) => {
                model.poll_events();
                model.show(ctx);
                if model.is_waiting() {
                    ctx.request_repaint_after(Duration::from_millis(100));
                }
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}

impl ViewModel {
    fn new(session: Session, start: &StartOptions) -> Self {
        let updates = session.subscribe();
        let radius = start
            .radius
            .unwrap_or(session.context().config.default_radius);

        let mut model = Self {
            session,
            updates,
            matcher: SkimMatcherV2::default(),
            center_input: String::new(),
            radius,
            window: None,
            enriched: false,
            genome_filter: String::new(),
            selected_genome: None,
            base_input: String::new(),
            bookmark_description: String::new(),
            status: None,
        };

        let center = match start.center.as_deref() {
            Some(input) => model.session.resolve_node(input).or_else(|| {
                model.status = Some(format!("Unknown node {input:?}"));
                None
            }),
            None => None,
        };
        if let Some(center) = center.or_else(|| (model.session.graph().node_count() > 0).then_some(0)) {
            model.navigate(center);
        }

        if let Some(genome) = &start.genome {
            model.select_genome(genome.clone());
        }

        model
    }

    /// Drains bus events; only the enrichment of the current window is kept.
    fn poll_events(&mut self) {
        while let Ok(event) = self.updates.events.try_recv() {
            match event {
                Event::MetadataCacheUpdated(subgraph) => {
                    let current = self.session.query();
                    if subgraph.center() == current.center() && subgraph.radius() == current.radius() {
                        self.window = Some(subgraph);
                        self.enriched = true;
                    }
                }
                Event::GenomeIndexReady { genome } => {
                    self.status = Some(format!("Coordinate index ready for {genome}"));
                }
                Event::CenterPointQueryChanged { .. } | Event::LayoutDone(_) => {}
            }
        }
    }

    fn is_waiting(&self) -> bool {
        let radius_threshold = self.session.context().config.radius_threshold;
        let awaiting_metadata =
            self.window.is_some() && !self.enriched && self.session.query().radius() < radius_threshold;
        let indexing = self.selected_genome.is_some() && !self.session.progress().snapshot().is_complete();
        awaiting_metadata || indexing
    }

    fn navigate(&mut self, center: NodeId) {
        match self.session.navigate(center, self.radius) {
            Ok(window) => {
                self.center_input = self.node_label(center);
                self.window = Some(window);
                self.enriched = false;
            }
            Err(error) => self.status = Some(error.to_string()),
        }
    }

    fn select_genome(&mut self, genome: String) {
        match self.session.index().populate_index(&genome) {
            Ok(()) => self.selected_genome = Some(genome),
            Err(error) => self.status = Some(error.to_string()),
        }
    }

    fn node_label(&self, id: NodeId) -> String {
        self.session
            .graph()
            .segment(id)
            .map_or_else(|| id.to_string(), |segment| segment.name.clone())
    }
}
