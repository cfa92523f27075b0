//! Fakes shared by the integration tests: a routed in-memory player, a
//! scripted picker and a canned recommendation provider.

#![allow(dead_code)]

use anyhow::Result;
use blue::cache::ResultCache;
use blue::commands;
use blue::config::Config;
use blue::dispatch::{Context, Dispatcher, Outcome};
use blue::picker::{Choice, Picker, Prompt};
use blue::recommend::{ProviderError, Recommender};
use blue::transport::{DeviceError, Transport};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;
use tempfile::TempDir;

/// One request seen by [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

struct Route {
    path: String,
    params: Vec<(String, String)>,
    /// Answer `n` is served after `n` deletions; the last one sticks.
    bodies: Vec<String>,
}

#[derive(Default)]
struct Player {
    routes: RefCell<Vec<Route>>,
    calls: RefCell<Vec<Call>>,
    fail_posts: Cell<bool>,
}

/// In-memory player. GETs are answered by the most specific route whose path
/// matches and whose params are all present in the request; POSTs succeed
/// unless told otherwise. Routes added with [`FakeTransport::after_deletes`]
/// change their answer as `Delete` requests come in. Clones share state.
#[derive(Clone, Default)]
pub struct FakeTransport {
    player: Rc<Player>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, path: &str, params: &[(&str, &str)], body: &str) -> &Self {
        self.after_deletes(path, params, &[body])
    }

    /// A route answering `bodies[n]` once `n` deletions have been posted.
    pub fn after_deletes(&self, path: &str, params: &[(&str, &str)], bodies: &[&str]) -> &Self {
        self.player.routes.borrow_mut().push(Route {
            path: path.to_string(),
            params: owned(params),
            bodies: bodies.iter().map(|b| (*b).to_string()).collect(),
        });
        self
    }

    fn deletes(&self) -> usize {
        self.player
            .calls
            .borrow()
            .iter()
            .filter(|c| c.method == "POST" && c.path == "Delete")
            .count()
    }

    pub fn fail_posts(&self) {
        self.player.fail_posts.set(true);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.player.calls.borrow().clone()
    }

    pub fn posts(&self) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.method == "POST").collect()
    }

    pub fn gets_to(&self, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == "GET" && c.path == path)
            .count()
    }

    fn record(&self, method: &'static str, path: &str, params: &[(&str, &str)]) {
        self.player.calls.borrow_mut().push(Call {
            method,
            path: path.to_string(),
            params: owned(params),
        });
    }
}

fn owned(params: &[(&str, &str)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

impl Transport for FakeTransport {
    fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<String, DeviceError> {
        self.record("GET", path, params);
        let deletes = self.deletes();
        let routes = self.player.routes.borrow();
        let body = routes
            .iter()
            .filter(|route| {
                route.path == path
                    && route
                        .params
                        .iter()
                        .all(|(k, v)| params.iter().any(|(pk, pv)| pk == k && pv == v))
            })
            .max_by_key(|route| route.params.len())
            .and_then(|route| route.bodies.get(deletes.min(route.bodies.len().saturating_sub(1))))
            .cloned()
            .ok_or_else(|| DeviceError::TransportUnavailable {
                endpoint: path.to_string(),
                reason: format!("no route for {params:?}"),
            });
        body
    }

    fn post(&self, path: &str, params: &[(&str, &str)]) -> Result<String, DeviceError> {
        self.record("POST", path, params);
        if self.player.fail_posts.get() {
            return Err(DeviceError::TransportUnavailable {
                endpoint: path.to_string(),
                reason: "connection reset".to_string(),
            });
        }
        Ok("<ok/>".to_string())
    }
}

/// Picker that answers from a script. Each answer is a list of label
/// fragments; an empty answer, or running out of answers, picks nothing.
#[derive(Clone, Default)]
pub struct ScriptedPicker {
    answers: Rc<RefCell<VecDeque<Vec<String>>>>,
    prompts: Rc<RefCell<Vec<String>>>,
}

impl ScriptedPicker {
    pub fn new(answers: &[&[&str]]) -> Self {
        let picker = Self::default();
        picker.answers.borrow_mut().extend(
            answers
                .iter()
                .map(|answer| answer.iter().map(|s| (*s).to_string()).collect::<Vec<_>>()),
        );
        picker
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    fn next_answer(&self, prompt: &Prompt<'_>) -> Vec<String> {
        self.prompts.borrow_mut().push(prompt.title.to_string());
        self.answers.borrow_mut().pop_front().unwrap_or_default()
    }
}

impl Picker for ScriptedPicker {
    fn pick(&self, prompt: &Prompt<'_>, choices: &[Choice]) -> Result<Option<Choice>> {
        let answer = self.next_answer(prompt);
        Ok(answer.first().and_then(|fragment| {
            choices
                .iter()
                .find(|choice| choice.label.contains(fragment.as_str()))
                .cloned()
        }))
    }

    fn pick_many(&self, prompt: &Prompt<'_>, choices: &[Choice]) -> Result<Vec<Choice>> {
        let answer = self.next_answer(prompt);
        Ok(choices
            .iter()
            .filter(|choice| answer.iter().any(|fragment| choice.label.contains(fragment.as_str())))
            .cloned()
            .collect())
    }
}

/// Answers recommendation prompts with `list` and explanation prompts with a
/// fixed sentence.
#[derive(Clone)]
pub struct CannedRecommender {
    pub list: String,
    pub calls: Rc<Cell<usize>>,
}

impl CannedRecommender {
    pub fn new(list: &str) -> Self {
        Self {
            list: list.to_string(),
            calls: Rc::new(Cell::new(0)),
        }
    }
}

impl Recommender for CannedRecommender {
    fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        self.calls.set(self.calls.get() + 1);
        if prompt.contains("Band Name - Album Name") {
            Ok(self.list.clone())
        } else {
            Ok("They share a producer.".to_string())
        }
    }
}

/// A context around the fakes, caching and keeping history under `dir`.
/// Volume ramps do not sleep.
pub fn context(
    dir: &TempDir,
    transport: &FakeTransport,
    picker: &ScriptedPicker,
    recommender: Option<CannedRecommender>,
) -> Context {
    let mut config = Config::with_cache_dir("127.0.0.1", 11000, dir.path().join("cache"));
    config.ramp.pause = Duration::ZERO;
    let cache = ResultCache::open(&config.cache_dir).expect("cache dir");
    Context {
        config,
        transport: Box::new(transport.clone()),
        cache,
        picker: Box::new(picker.clone()),
        recommender: recommender.map(|r| Box::new(r) as Box<dyn Recommender>),
    }
}

/// Dispatch one command line, e.g. `&["vol", "+5"]`.
pub fn run(context: &Context, line: &[&str]) -> Outcome {
    let registry = commands::registry().expect("command table registers");
    let dispatcher = Dispatcher::new(context, registry);
    let args: Vec<String> = line[1..].iter().map(|s| (*s).to_string()).collect();
    dispatcher.dispatch(line[0], &args)
}

pub fn status_xml(song: u32, artist: &str, album: &str, volume: u8) -> String {
    format!(
        "<status etag=\"4e2\"><artist>{artist}</artist><album>{album}</album><name>Track {song}</name>\
         <song>{song}</song><secs>30</secs><totlen>300</totlen><volume>{volume}</volume>\
         <state>play</state></status>"
    )
}

/// `(id, artist, album, album_id)` per queue entry.
pub fn playlist_xml(songs: &[(u32, &str, &str, u64)]) -> String {
    let songs: String = songs
        .iter()
        .map(|(id, artist, album, album_id)| {
            format!(
                "<song id=\"{id}\" albumid=\"{album_id}\"><art>{artist}</art><alb>{album}</alb>\
                 <title>Track {id}</title></song>"
            )
        })
        .collect();
    format!("<playlist name=\"queue\">{songs}</playlist>")
}

/// Routes for a library with two letter sections; `(artist, album)` pairs
/// are split between them.
pub fn library(transport: &FakeTransport, albums: &[(&str, &str)]) {
    transport
        .route(
            "Browse",
            &[],
            r#"<browse><item text="Library" browseKey="LOCAL"/><item text="Tidal" browseKey="Tidal:"/></browse>"#,
        )
        .route(
            "Browse",
            &[("key", "LOCAL")],
            r#"<browse><item text="Artists" browseKey="LOCAL:artists"/><item text="Albums" browseKey="LOCAL:albums"/></browse>"#,
        )
        .route(
            "Browse",
            &[("key", "LOCAL:albums")],
            r#"<browse><item text="A" browseKey="LOCAL:albums:A"/><item text="B" browseKey="LOCAL:albums:B"/></browse>"#,
        );

    let (first, second) = albums.split_at(albums.len() / 2);
    for (key, part, offset) in [("LOCAL:albums:A", first, 0), ("LOCAL:albums:B", second, first.len())] {
        let items: String = part
            .iter()
            .enumerate()
            .map(|(i, (artist, album))| {
                format!(
                    r#"<item text="{album}" text2="{artist}" playURL="/Add?playnow=1&amp;albumid={}&amp;service=LocalMusic"/>"#,
                    offset + i + 1
                )
            })
            .collect();
        transport.route("Browse", &[("key", key)], &format!("<browse>{items}</browse>"));
    }
}

/// An `Albums` listing with `(id, artist, title, date)` entries.
pub fn albums_xml(albums: &[(&str, &str, &str, &str)]) -> String {
    let albums: String = albums
        .iter()
        .map(|(id, artist, title, date)| {
            format!(
                "<album albumid=\"{id}\"><title>{title}</title><art>{artist}</art><tracks>10</tracks>\
                 <quality>CD</quality><date>{date}</date></album>"
            )
        })
        .collect();
    format!("<albums service=\"Tidal\">{albums}</albums>")
}
