#![allow(dead_code)]

use std::{
    net::{SocketAddr, TcpListener},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pokedex_bff::{
    cache::TtlCache,
    config::Config,
    db,
    service::{CacheSettings, PokemonService},
    store::{FavoriteStore, UserStore},
    upstream::PokeApiClient,
    AppState,
};
use serde::Deserialize;
use serde_json::{json, Value};

pub const SPRITE_URL: &str = "https://sprites.test/pokemon";

/// How long the fake upstream stalls before answering `/move/yawn`.
pub const SLOW_RESPONSE: Duration = Duration::from_secs(2);

const NAMES: [&str; 6] = [
    "bulbasaur",
    "ivysaur",
    "venusaur",
    "charmander",
    "charmeleon",
    "charizard",
];

/// Request counters of the fake upstream, one per data kind.
#[derive(Debug, Default)]
pub struct Hits {
    pub pages: AtomicUsize,
    pub details: AtomicUsize,
    pub moves: AtomicUsize,
    pub abilities: AtomicUsize,
}

impl Hits {
    pub fn pages(&self) -> usize {
        self.pages.load(Ordering::SeqCst)
    }

    pub fn details(&self) -> usize {
        self.details.load(Ordering::SeqCst)
    }

    pub fn moves(&self) -> usize {
        self.moves.load(Ordering::SeqCst)
    }

    pub fn abilities(&self) -> usize {
        self.abilities.load(Ordering::SeqCst)
    }
}

pub struct FakeUpstream {
    pub base_url: String,
    pub hits: Arc<Hits>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    offset: usize,
    limit: usize,
}

async fn page(State(hits): State<Arc<Hits>>, Query(query): Query<PageQuery>) -> Json<Value> {
    hits.pages.fetch_add(1, Ordering::SeqCst);
    let results: Vec<Value> = NAMES
        .iter()
        .enumerate()
        .skip(query.offset)
        .take(query.limit)
        .map(|(i, name)| {
            json!({
                "name": name,
                "url": format!("https://pokeapi.co/api/v2/pokemon/{}/", i + 1),
            })
        })
        .collect();

    Json(json!({ "count": NAMES.len(), "next": null, "previous": null, "results": results }))
}

async fn details(State(hits): State<Arc<Hits>>, Path(name_or_id): Path<String>) -> Response {
    hits.details.fetch_add(1, Ordering::SeqCst);
    let found = NAMES
        .iter()
        .enumerate()
        .find(|(i, name)| **name == name_or_id || (i + 1).to_string() == name_or_id);

    let Some((i, name)) = found else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    Json(json!({
        "id": i + 1,
        "name": name,
        "height": 7,
        "weight": 69,
        "base_experience": 64,
        "abilities": [{ "ability": { "name": "overgrow", "url": "" }, "is_hidden": false, "slot": 1 }],
        "types": [{ "slot": 1, "type": { "name": "grass", "url": "" } }],
        "stats": [
            { "base_stat": 45, "effort": 0, "stat": { "name": "hp", "url": "" } },
            { "base_stat": 49, "effort": 0, "stat": { "name": "attack", "url": "" } }
        ],
        "moves": [{ "move": { "name": "razor-wind", "url": "" }, "version_group_details": [] }],
        "sprites": { "front_default": null }
    }))
    .into_response()
}

async fn move_details(State(hits): State<Arc<Hits>>, Path(name): Path<String>) -> Response {
    hits.moves.fetch_add(1, Ordering::SeqCst);
    if name == "yawn" {
        tokio::time::sleep(SLOW_RESPONSE).await;
    }
    if name != "pound" {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }
    Json(json!({ "id": 1, "name": "pound", "power": 40, "pp": 35 })).into_response()
}

async fn ability_details(State(hits): State<Arc<Hits>>, Path(name): Path<String>) -> Response {
    hits.abilities.fetch_add(1, Ordering::SeqCst);
    if name != "overgrow" {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }
    Json(json!({ "id": 65, "name": "overgrow", "is_main_series": true })).into_response()
}

/// Serves a six-entry Pokémon catalog on an ephemeral local port.
pub fn spawn_upstream() -> FakeUpstream {
    let hits = Arc::new(Hits::default());
    let app = Router::new()
        .route("/pokemon", get(page))
        .route("/pokemon/:name_or_id", get(details))
        .route("/move/:name", get(move_details))
        .route("/ability/:name", get(ability_details))
        .with_state(hits.clone());

    let addr = serve(app);
    FakeUpstream {
        base_url: format!("http://{addr}"),
        hits,
    }
}

fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service())
            .await
            .unwrap();
    });

    addr
}

pub fn settings() -> CacheSettings {
    CacheSettings {
        ttl: Duration::from_secs(60),
        catalog_ttl: Duration::from_secs(600),
        check_period: Duration::from_secs(60),
    }
}

pub struct Harness {
    pub upstream: FakeUpstream,
    pub service: PokemonService,
    pub users: UserStore,
}

/// A service over a fresh in-memory database and a fresh fake upstream.
pub async fn harness() -> Harness {
    harness_with(spawn_upstream()).await
}

pub async fn harness_with(upstream: FakeUpstream) -> Harness {
    harness_with_timeout(upstream, Duration::from_secs(5)).await
}

pub async fn harness_with_timeout(upstream: FakeUpstream, timeout: Duration) -> Harness {
    let pool = db::connect("sqlite::memory:", 1).await.unwrap();
    let client = PokeApiClient::new(&upstream.base_url, SPRITE_URL, timeout).unwrap();
    let service = PokemonService::new(
        TtlCache::new(),
        client,
        FavoriteStore::new(pool.clone()),
        settings(),
        100,
    );

    Harness {
        upstream,
        service,
        users: UserStore::new(pool),
    }
}

pub fn config(pokeapi_url: &str) -> Config {
    Config {
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        database_url: "sqlite::memory:".into(),
        database_max_connections: 1,
        pokeapi_url: pokeapi_url.into(),
        sprite_url: SPRITE_URL.into(),
        upstream_timeout: Duration::from_secs(5),
        catalog_limit: 100,
        cache: settings(),
        jwt_secret: "test-secret".into(),
        token_expiry: Duration::from_secs(3600),
    }
}

/// The full `/v1` application, wired to a fake upstream.
pub async fn app() -> (Router, Arc<Hits>) {
    let upstream = spawn_upstream();
    let config = config(&upstream.base_url);
    let pool = db::connect(&config.database_url, config.database_max_connections)
        .await
        .unwrap();
    let state = AppState::new(&config, pool).unwrap();

    (pokedex_bff::routes::router(state), upstream.hits)
}
