//! Client for the public Pokémon data API.
//!
//! Every fetch issues exactly one GET, bounded by the client timeout, and either
//! returns the fully normalized record or an [`UpstreamError`] naming the URL.

use std::time::{Duration, Instant};

use metrics::histogram;
use reqwest::Url;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::{
    entities::{
        AbilityDetails, MoveDetails, NamedEntry, PokemonDetails, PokemonSummary, StatEntry,
    },
    util::{parse_trailing_id, thumbnail_url},
};

#[derive(Debug, Clone, Error)]
#[error("failed to fetch data from {url}: {reason}")]
pub struct UpstreamError {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct PokeApiClient {
    http: reqwest::Client,
    base_url: String,
    sprite_url: String,
}

impl PokeApiClient {
    pub fn new(
        base_url: &str,
        sprite_url: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            sprite_url: sprite_url.trim_end_matches('/').to_owned(),
        })
    }

    pub async fn fetch_summary_page(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PokemonSummary>, UpstreamError> {
        let url = format!("{}/pokemon?offset={offset}&limit={limit}", self.base_url);
        let page: ResourceList = self.get_json(&url, "page").await?;

        page.results
            .into_iter()
            .map(|resource| {
                let id = parse_trailing_id(&resource.url).ok_or_else(|| UpstreamError {
                    url: url.clone(),
                    reason: format!("no numeric id at the end of {}", resource.url),
                })?;
                Ok(PokemonSummary {
                    thumbnail: thumbnail_url(&self.sprite_url, id),
                    name: resource.name,
                    url: resource.url,
                    id,
                })
            })
            .collect()
    }

    pub async fn fetch_details(&self, name_or_id: &str) -> Result<PokemonDetails, UpstreamError> {
        let url = self.resource_url("pokemon", name_or_id)?;
        let raw: RawDetails = self.get_json(url.as_str(), "pokemon").await?;
        Ok(raw.into())
    }

    pub async fn fetch_move(&self, name: &str) -> Result<MoveDetails, UpstreamError> {
        let url = self.resource_url("move", name)?;
        self.get_json(url.as_str(), "move").await
    }

    pub async fn fetch_ability(&self, name: &str) -> Result<AbilityDetails, UpstreamError> {
        let url = self.resource_url("ability", name)?;
        self.get_json(url.as_str(), "ability").await
    }

    /// `<base>/<kind>/<name>`, with `name` escaped into a single path segment.
    fn resource_url(&self, kind: &str, name: &str) -> Result<Url, UpstreamError> {
        let invalid = |reason: String| UpstreamError {
            url: format!("{}/{kind}/{name}", self.base_url),
            reason,
        };

        let mut url = Url::parse(&self.base_url).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("base url cannot carry a path".into()))?
            .pop_if_empty()
            .push(kind)
            .push(name);

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        kind: &'static str,
    ) -> Result<T, UpstreamError> {
        let start = Instant::now();
        let result = self.send(url).await;
        histogram!("pokedex_upstream_fetch_time", start.elapsed(), "kind" => kind);

        match result {
            Ok(value) => {
                debug!(%url, "fetched upstream data");
                Ok(value)
            }
            Err(err) => {
                error!(%url, error = %err, "error fetching upstream data");
                Err(UpstreamError {
                    url: url.to_owned(),
                    reason: err.to_string(),
                })
            }
        }
    }

    async fn send<T: DeserializeOwned>(&self, url: &str) -> reqwest::Result<T> {
        self.http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await
    }
}

#[derive(Debug, Deserialize)]
struct ResourceList {
    results: Vec<NamedResource>,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AbilitySlot {
    ability: Named,
}

#[derive(Debug, Deserialize)]
struct TypeSlot {
    #[serde(rename = "type")]
    kind: Named,
}

#[derive(Debug, Deserialize)]
struct MoveSlot {
    #[serde(rename = "move")]
    learned: Named,
}

#[derive(Debug, Deserialize)]
struct StatSlot {
    base_stat: i64,
    stat: Named,
}

#[derive(Debug, Deserialize)]
struct RawDetails {
    id: i64,
    name: String,
    abilities: Vec<AbilitySlot>,
    types: Vec<TypeSlot>,
    height: i64,
    weight: i64,
    base_experience: Option<i64>,
    stats: Vec<StatSlot>,
    moves: Vec<MoveSlot>,
}

impl From<RawDetails> for PokemonDetails {
    fn from(raw: RawDetails) -> Self {
        Self {
            id: raw.id,
            name: raw.name,
            abilities: raw
                .abilities
                .into_iter()
                .map(|slot| NamedEntry::new(slot.ability.name))
                .collect(),
            types: raw
                .types
                .into_iter()
                .map(|slot| NamedEntry::new(slot.kind.name))
                .collect(),
            height: raw.height,
            weight: raw.weight,
            base_experience: raw.base_experience,
            stats: raw
                .stats
                .into_iter()
                .map(|slot| StatEntry {
                    stat_name: slot.stat.name,
                    base_value: slot.base_stat,
                })
                .collect(),
            moves: raw
                .moves
                .into_iter()
                .map(|slot| NamedEntry::new(slot.learned.name))
                .collect(),
        }
    }
}
