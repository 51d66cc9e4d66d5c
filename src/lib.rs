#![forbid(unsafe_code)]
#![deny(clippy::missing_const_for_fn)]
#![deny(clippy::nursery)]
#![deny(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

use sqlx::SqlitePool;

use crate::{
    auth::Tokens,
    cache::TtlCache,
    config::Config,
    service::PokemonService,
    store::{FavoriteStore, UserStore},
    upstream::PokeApiClient,
};

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod routes;
pub mod service;
pub mod store;
pub mod upstream;
pub mod util;

#[derive(Clone)]
pub struct AppState {
    // One cache instance for the whole process, owned by the service.
    pub pokemon: PokemonService,
    pub users: UserStore,
    pub tokens: Tokens,
}

impl AppState {
    pub fn new(config: &Config, pool: SqlitePool) -> color_eyre::Result<Self> {
        let client = PokeApiClient::new(
            &config.pokeapi_url,
            &config.sprite_url,
            config.upstream_timeout,
        )?;

        Ok(Self {
            pokemon: PokemonService::new(
                TtlCache::new(),
                client,
                FavoriteStore::new(pool.clone()),
                config.cache,
                config.catalog_limit,
            ),
            users: UserStore::new(pool),
            tokens: Tokens::new(&config.jwt_secret, config.token_expiry)?,
        })
    }
}
