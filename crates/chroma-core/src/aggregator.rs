// Combines the remote sources with a fixed fallback order.
//
// Every public operation makes a small number of sequential source calls and
// reports "nothing found" as `None`. The only shared state is the optional
// palette cache, which moves from empty to filled at most once.

use std::sync::Arc;

use anyhow::Context;
use rand::seq::IndexedRandom;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::color::{dedup_preserving_order, Color, Palette, PALETTE_SIZE};
use crate::config::Config;
use crate::sources::{
    ColorListSource, HttpColorList, HttpPaletteGenerator, HttpPaletteList, PaletteGenerator,
    PaletteListSource,
};
use crate::theme::Theme;

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// The three capabilities the aggregator draws from.
#[derive(Clone)]
pub struct Sources {
    pub colors: Arc<dyn ColorListSource>,
    pub palettes: Arc<dyn PaletteListSource>,
    pub generator: Arc<dyn PaletteGenerator>,
}

#[derive(Debug, Clone, Copy)]
pub struct AggregatorOptions {
    pub cache_palettes: bool,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            cache_palettes: true,
        }
    }
}

/// How many items each list source currently returns (`None` = unavailable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStatus {
    pub colors: Option<usize>,
    pub palettes: Option<usize>,
}

pub struct Aggregator {
    sources: Sources,
    options: AggregatorOptions,
    palette_cache: OnceCell<Vec<Palette>>,
}

impl Aggregator {
    pub fn new(sources: Sources, options: AggregatorOptions) -> Self {
        Self {
            sources,
            options,
            palette_cache: OnceCell::new(),
        }
    }

    /// Build an aggregator backed by the HTTP sources named in `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let timeout = config.sources.timeout();
        let sources = Sources {
            colors: Arc::new(
                HttpColorList::new(&config.sources.color_list_url, timeout)
                    .context("failed to build color-list client")?,
            ),
            palettes: Arc::new(
                HttpPaletteList::new(&config.sources.palette_list_url, timeout)
                    .context("failed to build palette-list client")?,
            ),
            generator: Arc::new(
                HttpPaletteGenerator::new(&config.sources.generator_url, timeout)
                    .context("failed to build palette generator client")?,
            ),
        };
        let options = AggregatorOptions {
            cache_palettes: config.aggregator.cache_palettes,
        };
        Ok(Self::new(sources, options))
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Colors from the color-list source, as returned. No fallback.
    pub async fn get_colors(&self) -> Option<Vec<Color>> {
        self.sources.colors.fetch_colors().await.ok()
    }

    /// Palettes from the palette-list source.
    ///
    /// With caching on, the first non-empty result is kept and served for
    /// the lifetime of this aggregator. Failed or empty fetches leave the
    /// cache untouched. Concurrent first callers wait on one fetch.
    pub async fn get_palettes(&self) -> Option<Vec<Palette>> {
        if !self.options.cache_palettes {
            return self.sources.palettes.fetch_palettes().await.ok();
        }

        let cached = self
            .palette_cache
            .get_or_try_init(|| async {
                match self.sources.palettes.fetch_palettes().await {
                    Ok(palettes) if !palettes.is_empty() => {
                        info!(count = palettes.len(), "palette cache populated");
                        Ok(palettes)
                    }
                    Ok(palettes) => Err(Some(palettes)),
                    Err(_) => Err(None),
                }
            })
            .await;

        match cached {
            Ok(palettes) => Some(palettes.clone()),
            Err(uncached) => uncached,
        }
    }

    /// A palette from the first source that can supply one:
    /// a random listed palette, then five distinct random colors, then
    /// nothing.
    pub async fn get_random_palette(&self) -> Option<Palette> {
        if let Some(palettes) = self.get_palettes().await {
            let picked = palettes.choose(&mut rand::rng()).copied();
            if picked.is_some() {
                return picked;
            }
        }

        if let Some(colors) = self.get_colors().await {
            let distinct = dedup_preserving_order(colors);
            if distinct.len() >= PALETTE_SIZE {
                let sample: Vec<Color> = distinct
                    .choose_multiple(&mut rand::rng(), PALETTE_SIZE)
                    .copied()
                    .collect();
                return Palette::from_leading(&sample).ok();
            }
            debug!(count = distinct.len(), "too few distinct colors for a palette");
        }

        warn!("no source could supply a random palette");
        None
    }

    /// Colors for a theme given by name. Unknown names yield `None` without
    /// touching the network.
    pub async fn get_colors_by_theme(&self, theme: &str) -> Option<Vec<Color>> {
        match theme.parse::<Theme>() {
            Ok(theme) => Some(self.colors_for_theme(theme).await),
            Err(e) => {
                debug!(error = %e, "rejecting theme request");
                None
            }
        }
    }

    /// Up to five distinct colors for `theme`, trying the generator, then the
    /// palette list at a theme-determined index, then the built-in table.
    pub async fn colors_for_theme(&self, theme: Theme) -> Vec<Color> {
        let colors = self.resolve_theme_colors(theme).await;
        let mut distinct = dedup_preserving_order(colors);
        distinct.truncate(PALETTE_SIZE);
        distinct
    }

    async fn resolve_theme_colors(&self, theme: Theme) -> Vec<Color> {
        match self.sources.generator.generate().await {
            Ok(palette) => return palette.to_vec(),
            Err(e) => debug!(theme = %theme, error = %e, "generator unavailable"),
        }

        if let Some(palettes) = self.get_palettes().await {
            if !palettes.is_empty() {
                let index = theme.position() % palettes.len();
                return palettes[index].to_vec();
            }
        }

        info!(theme = %theme, "serving built-in palette");
        theme.builtin_palette().to_vec()
    }

    /// Probe both list sources directly, bypassing the palette cache.
    pub async fn source_status(&self) -> SourceStatus {
        let colors = self.sources.colors.fetch_colors().await.ok().map(|c| c.len());
        let palettes = self
            .sources
            .palettes
            .fetch_palettes()
            .await
            .ok()
            .map(|p| p.len());
        SourceStatus { colors, palettes }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
