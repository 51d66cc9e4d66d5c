//! Cache-or-fetch access to the upstream Pokémon data, and the favorites workflow
//! that hydrates stored ids against the cached catalog.

use std::{collections::HashSet, fmt, future::Future, sync::Arc, time::Duration};

use color_eyre::eyre::eyre;
use metrics::increment_counter;
use tracing::debug;

use crate::{
    cache::TtlCache,
    entities::{AbilityDetails, FavoritePokemon, MoveDetails, PokemonDetails, PokemonSummary},
    error::AppError,
    store::FavoriteStore,
    upstream::{PokeApiClient, UpstreamError},
};

/// Values held by the shared cache.
#[derive(Debug, Clone)]
pub enum Cached {
    Summaries(Arc<Vec<PokemonSummary>>),
    Details(Arc<PokemonDetails>),
    Document(Arc<serde_json::Value>),
}

pub trait Cacheable: Sized {
    fn into_cached(self) -> Cached;
    fn from_cached(cached: Cached) -> Option<Self>;
}

impl Cacheable for Arc<Vec<PokemonSummary>> {
    fn into_cached(self) -> Cached {
        Cached::Summaries(self)
    }

    fn from_cached(cached: Cached) -> Option<Self> {
        match cached {
            Cached::Summaries(value) => Some(value),
            _ => None,
        }
    }
}

impl Cacheable for Arc<PokemonDetails> {
    fn into_cached(self) -> Cached {
        Cached::Details(self)
    }

    fn from_cached(cached: Cached) -> Option<Self> {
        match cached {
            Cached::Details(value) => Some(value),
            _ => None,
        }
    }
}

impl Cacheable for Arc<serde_json::Value> {
    fn into_cached(self) -> Cached {
        Cached::Document(self)
    }

    fn from_cached(cached: Cached) -> Option<Self> {
        match cached {
            Cached::Document(value) => Some(value),
            _ => None,
        }
    }
}

/// Cache keys, prefixed by data kind so names never collide across kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKey<'a> {
    Page { offset: i64, limit: i64 },
    Catalog,
    PokemonById(u32),
    PokemonByName(&'a str),
    Move(&'a str),
    Ability(&'a str),
}

impl CacheKey<'_> {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Page { .. } => "page",
            Self::Catalog => "catalog",
            Self::PokemonById(_) | Self::PokemonByName(_) => "pokemon",
            Self::Move(_) => "move",
            Self::Ability(_) => "ability",
        }
    }
}

impl fmt::Display for CacheKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page { offset, limit } => write!(f, "pokemonList-{offset}-{limit}"),
            Self::Catalog => f.write_str("pokemonList:all"),
            Self::PokemonById(id) => write!(f, "pokemon:id:{id}"),
            Self::PokemonByName(name) => write!(f, "pokemon:name:{name}"),
            Self::Move(name) => write!(f, "move:{name}"),
            Self::Ability(name) => write!(f, "ability:{name}"),
        }
    }
}

/// Dot segments would resolve to another upstream resource once joined into a URL.
fn resource_name(name: &str) -> Result<&str, AppError> {
    match name {
        "" | "." | ".." => Err(AppError::BadRequest(format!("invalid name {name:?}"))),
        _ => Ok(name),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub catalog_ttl: Duration,
    pub check_period: Duration,
}

#[derive(Clone)]
pub struct PokemonService {
    cache: TtlCache<Cached>,
    client: PokeApiClient,
    favorites: FavoriteStore,
    ttl: Duration,
    catalog_ttl: Duration,
    catalog_limit: i64,
}

impl PokemonService {
    pub const fn new(
        cache: TtlCache<Cached>,
        client: PokeApiClient,
        favorites: FavoriteStore,
        settings: CacheSettings,
        catalog_limit: i64,
    ) -> Self {
        Self {
            cache,
            client,
            favorites,
            ttl: settings.ttl,
            catalog_ttl: settings.catalog_ttl,
            catalog_limit,
        }
    }

    pub const fn cache(&self) -> &TtlCache<Cached> {
        &self.cache
    }

    async fn cached<T, F>(&self, key: CacheKey<'_>, ttl: Duration, fetch: F) -> Result<T, AppError>
    where
        T: Cacheable,
        F: Future<Output = Result<T, UpstreamError>>,
    {
        let name = key.to_string();

        if let Some(hit) = self.cache.get(&name).await.and_then(T::from_cached) {
            debug!(key = %name, "returning cached data");
            increment_counter!("pokedex_cache_hit", "kind" => key.kind());
            return Ok(hit);
        }
        increment_counter!("pokedex_cache_miss", "kind" => key.kind());

        let cached = self
            .cache
            .get_or_try_insert_with(name, ttl, async move { fetch.await.map(T::into_cached) })
            .await
            .map_err(|err| AppError::Upstream((*err).clone()))?;

        T::from_cached(cached)
            .ok_or_else(|| AppError::Internal(eyre!("cache entry {key} holds another kind")))
    }

    pub async fn get_pokemon_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Arc<Vec<PokemonSummary>>, AppError> {
        self.cached(CacheKey::Page { offset, limit }, self.ttl, async {
            self.client
                .fetch_summary_page(offset, limit)
                .await
                .map(Arc::new)
        })
        .await
    }

    pub async fn get_details_by_id(&self, id: u32) -> Result<Arc<PokemonDetails>, AppError> {
        self.cached(CacheKey::PokemonById(id), self.ttl, async {
            self.client.fetch_details(&id.to_string()).await.map(Arc::new)
        })
        .await
    }

    pub async fn get_details_by_name(&self, name: &str) -> Result<Arc<PokemonDetails>, AppError> {
        let name = resource_name(name)?;
        self.cached(CacheKey::PokemonByName(name), self.ttl, async {
            self.client.fetch_details(name).await.map(Arc::new)
        })
        .await
    }

    pub async fn get_move_details(&self, name: &str) -> Result<Arc<MoveDetails>, AppError> {
        let name = resource_name(name)?;
        self.cached(CacheKey::Move(name), self.ttl, async {
            self.client.fetch_move(name).await.map(Arc::new)
        })
        .await
    }

    pub async fn get_ability_details(&self, name: &str) -> Result<Arc<AbilityDetails>, AppError> {
        let name = resource_name(name)?;
        self.cached(CacheKey::Ability(name), self.ttl, async {
            self.client.fetch_ability(name).await.map(Arc::new)
        })
        .await
    }

    /// The whole upstream catalog, fetched at most once per catalog TTL.
    pub(crate) async fn full_catalog(&self) -> Result<Arc<Vec<PokemonSummary>>, AppError> {
        self.cached(CacheKey::Catalog, self.catalog_ttl, async {
            self.client
                .fetch_summary_page(0, self.catalog_limit)
                .await
                .map(Arc::new)
        })
        .await
    }

    pub async fn add_favorites(
        &self,
        user_id: i64,
        pokemon_ids: &[i64],
    ) -> Result<FavoritePokemon, AppError> {
        let existing: HashSet<i64> = self.favorites.find_by_user(user_id).await?.into_iter().collect();

        let mut seen = HashSet::new();
        let new_ids: Vec<i64> = pokemon_ids
            .iter()
            .copied()
            .filter(|id| !existing.contains(id) && seen.insert(*id))
            .collect();

        if !new_ids.is_empty() {
            let inserted = self
                .favorites
                .bulk_create(user_id, &new_ids)
                .await
                .map_err(AppError::FavoriteWrite)?;
            debug!(user_id, inserted, "favorites added");
        }

        self.hydrated_favorites(user_id).await
    }

    /// Removing an id that is not a favorite is a no-op.
    pub async fn remove_favorite(
        &self,
        user_id: i64,
        pokemon_id: i64,
    ) -> Result<FavoritePokemon, AppError> {
        let removed = self
            .favorites
            .destroy(user_id, pokemon_id)
            .await
            .map_err(AppError::FavoriteWrite)?;
        debug!(user_id, pokemon_id, removed, "favorite removed");

        self.hydrated_favorites(user_id).await
    }

    pub async fn list_favorites(&self, user_id: i64) -> Result<FavoritePokemon, AppError> {
        self.hydrated_favorites(user_id).await
    }

    /// Stored ids missing from the catalog are dropped; catalog order is kept.
    async fn hydrated_favorites(&self, user_id: i64) -> Result<FavoritePokemon, AppError> {
        let ids: HashSet<i64> = self.favorites.find_by_user(user_id).await?.into_iter().collect();
        if ids.is_empty() {
            return Ok(FavoritePokemon {
                favorite_pokemon: Vec::new(),
            });
        }

        let catalog = self.full_catalog().await?;
        let favorite_pokemon = catalog
            .iter()
            .filter(|pokemon| ids.contains(&pokemon.id))
            .cloned()
            .collect();

        Ok(FavoritePokemon { favorite_pokemon })
    }
}
