// Text commands: parse what the user typed, call the core, render a reply.

use std::sync::{Arc, Mutex};

use tracing::{error, info};

use chroma_core::aggregator::Aggregator;
use chroma_core::color::{adjust_colors, join_hex, Color, Direction, Palette};
use chroma_core::db::FavoriteStore;
use chroma_core::theme::Theme;

const UNAVAILABLE: &str = "Color sources are temporarily unavailable. Please try again later.";

const HELP: &str = "\
Commands:
  colors                 trending colors (GitHub language colors)
  palettes               popular palettes
  random                 a random palette from whichever source answers
  theme <name>           a palette for a theme (see `themes`)
  themes                 list themes
  brighter <hex...>      brighten colors
  darker <hex...>        darken colors
  save <hex>             add a color to favorites
  favorites              show saved colors
  save-palette [name]    save the last random or theme palette
  saved-palettes         show saved palettes
  clear                  remove all favorites
  stats                  favorite counts
  status                 check the color sources
  quit                   exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Colors,
    Palettes,
    Random,
    Themes,
    Theme(String),
    Adjust(Direction, Vec<String>),
    Save(String),
    Favorites,
    SavePalette(String),
    SavedPalettes,
    Clear,
    Stats,
    Status,
    Quit,
    Unknown(String),
}

/// Map one line of user input to a command.
pub fn parse_command(line: &str) -> Command {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Command::Unknown(String::new());
    };
    let rest: Vec<String> = words.map(str::to_string).collect();

    match head.to_ascii_lowercase().as_str() {
        "/start" | "start" => Command::Start,
        "/help" | "help" => Command::Help,
        "colors" | "trending" => Command::Colors,
        "palettes" => Command::Palettes,
        "random" => Command::Random,
        "themes" => Command::Themes,
        "theme" => Command::Theme(rest.join(" ")),
        "brighter" => Command::Adjust(Direction::Brighter, rest),
        "darker" => Command::Adjust(Direction::Darker, rest),
        "save" => Command::Save(rest.join(" ")),
        "favorites" | "favs" => Command::Favorites,
        "save-palette" => Command::SavePalette(rest.join(" ")),
        "saved-palettes" => Command::SavedPalettes,
        "clear" => Command::Clear,
        "stats" => Command::Stats,
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.trim().to_string()),
    }
}

/// Handles commands for a single user.
pub struct Handlers {
    aggregator: Aggregator,
    store: Arc<dyn FavoriteStore>,
    user_id: i64,
    /// Last palette shown by `random` or `theme`, with its default name.
    last_palette: Mutex<Option<(String, Palette)>>,
}

impl Handlers {
    pub fn new(aggregator: Aggregator, store: Arc<dyn FavoriteStore>, user_id: i64) -> Self {
        Self {
            aggregator,
            store,
            user_id,
            last_palette: Mutex::new(None),
        }
    }

    /// Produce the reply text for `command`.
    pub async fn handle(&self, command: &Command) -> String {
        info!(?command, user_id = self.user_id, "handling command");
        match command {
            Command::Start => format!("Welcome to chroma!\n\n{HELP}"),
            Command::Help => HELP.to_string(),
            Command::Colors => match self.aggregator.get_colors().await {
                Some(colors) if !colors.is_empty() => render_color_rows(&colors),
                _ => UNAVAILABLE.to_string(),
            },
            Command::Palettes => match self.aggregator.get_palettes().await {
                Some(palettes) if !palettes.is_empty() => render_palettes(&palettes),
                _ => UNAVAILABLE.to_string(),
            },
            Command::Random => match self.aggregator.get_random_palette().await {
                Some(palette) => {
                    self.remember_palette("random", palette);
                    format!("Random palette:\n{palette}")
                }
                None => UNAVAILABLE.to_string(),
            },
            Command::Themes => render_themes(),
            Command::Theme(name) if name.is_empty() => {
                format!("Usage: theme <name>. Available themes:\n{}", render_themes())
            }
            Command::Theme(name) => match self.aggregator.get_colors_by_theme(name).await {
                Some(colors) => {
                    if let Ok(palette) = Palette::from_leading(&colors) {
                        self.remember_palette(name, palette);
                    }
                    format!("Palette for {name}:\n{}", join_hex(&colors))
                }
                None => format!("Unknown theme `{name}`. Type `themes` to see the list."),
            },
            Command::Adjust(_, colors) if colors.is_empty() => {
                "Give one or more colors, e.g. `brighter #FF5733`.".to_string()
            }
            Command::Adjust(direction, colors) => adjust_colors(colors, *direction).join(" "),
            Command::Save(raw) => self.save(raw),
            Command::Favorites => self.favorites(),
            Command::SavePalette(name) => self.save_palette(name),
            Command::SavedPalettes => self.saved_palettes(),
            Command::Clear => match self.store.clear_favorites(self.user_id) {
                Ok(_) => "Favorites cleared.".to_string(),
                Err(e) => storage_failure(&e),
            },
            Command::Stats => match self.store.stats(self.user_id) {
                Ok(stats) => format!(
                    "Favorite colors: {}\nFavorite palettes: {}",
                    stats.favorite_colors, stats.favorite_palettes
                ),
                Err(e) => storage_failure(&e),
            },
            Command::Status => {
                let status = self.aggregator.source_status().await;
                format!(
                    "Color list: {}\nPalette list: {}",
                    describe_count(status.colors, "colors"),
                    describe_count(status.palettes, "palettes")
                )
            }
            Command::Quit => "Bye!".to_string(),
            Command::Unknown(_) => "Use the commands listed in /help.".to_string(),
        }
    }

    fn save(&self, raw: &str) -> String {
        let color = match Color::parse(raw) {
            Ok(color) => color,
            Err(e) => return format!("Can't save that: {e}"),
        };
        match self.store.add_favorite(self.user_id, &color) {
            Ok(true) => format!("Saved {color} to favorites."),
            Ok(false) => format!("{color} is already in your favorites."),
            Err(e) => storage_failure(&e),
        }
    }

    fn remember_palette(&self, name: &str, palette: Palette) {
        *self.last_palette.lock().expect("last palette mutex poisoned") =
            Some((name.to_string(), palette));
    }

    fn save_palette(&self, name: &str) -> String {
        let last = self
            .last_palette
            .lock()
            .expect("last palette mutex poisoned")
            .clone();
        let Some((shown_as, palette)) = last else {
            return "Nothing to save yet. Try `random` or `theme <name>` first.".to_string();
        };
        let name = if name.is_empty() { shown_as.as_str() } else { name };
        match self.store.add_favorite_palette(self.user_id, name, &palette) {
            Ok(()) => format!("Saved palette `{name}`: {palette}"),
            Err(e) => storage_failure(&e),
        }
    }

    fn saved_palettes(&self) -> String {
        match self.store.list_favorite_palettes(self.user_id) {
            Ok(saved) if saved.is_empty() => {
                "No saved palettes yet. Use `save-palette [name]`.".to_string()
            }
            Ok(saved) => {
                let lines = saved
                    .iter()
                    .map(|p| format!("{}: {}", p.name, join_hex(&p.colors)))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("Your palettes:\n{lines}")
            }
            Err(e) => storage_failure(&e),
        }
    }

    fn favorites(&self) -> String {
        match self.store.list_favorites(self.user_id) {
            Ok(colors) if colors.is_empty() => "No favorites yet. Use `save <hex>`.".to_string(),
            Ok(colors) => format!("Your favorites:\n{}", render_color_rows(&colors)),
            Err(e) => storage_failure(&e),
        }
    }
}

fn storage_failure(err: &anyhow::Error) -> String {
    error!("favorites storage error: {err:#}");
    "Couldn't reach your favorites right now.".to_string()
}

fn describe_count(count: Option<usize>, noun: &str) -> String {
    match count {
        Some(n) => format!("available ({n} {noun})"),
        None => "unavailable".to_string(),
    }
}

fn render_themes() -> String {
    Theme::ALL
        .iter()
        .map(|t| format!("{:<14} {}", t.name(), t.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Five colors per line.
fn render_color_rows(colors: &[Color]) -> String {
    colors
        .chunks(5)
        .map(join_hex)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_palettes(palettes: &[Palette]) -> String {
    palettes
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Palette #{}: {p}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chroma_core::aggregator::{AggregatorOptions, Sources};
    use chroma_core::db::Database;
    use chroma_core::sources::{ColorListSource, FetchError, PaletteGenerator, PaletteListSource};

    /// Every source fails.
    struct Offline;

    #[async_trait]
    impl ColorListSource for Offline {
        async fn fetch_colors(&self) -> Result<Vec<Color>, FetchError> {
            Err(FetchError::Timeout)
        }
    }

    #[async_trait]
    impl PaletteListSource for Offline {
        async fn fetch_palettes(&self) -> Result<Vec<Palette>, FetchError> {
            Err(FetchError::Timeout)
        }
    }

    #[async_trait]
    impl PaletteGenerator for Offline {
        async fn generate(&self) -> Result<Palette, FetchError> {
            Err(FetchError::Timeout)
        }
    }

    /// Returns a fixed list of seven colors.
    struct SevenColors;

    #[async_trait]
    impl ColorListSource for SevenColors {
        async fn fetch_colors(&self) -> Result<Vec<Color>, FetchError> {
            Ok((1..=7).map(|v| Color::new(v, v, v)).collect())
        }
    }

    fn handlers(colors: Arc<dyn ColorListSource>) -> Handlers {
        let aggregator = Aggregator::new(
            Sources {
                colors,
                palettes: Arc::new(Offline),
                generator: Arc::new(Offline),
            },
            AggregatorOptions::default(),
        );
        let store = Arc::new(Database::open(":memory:").unwrap());
        Handlers::new(aggregator, store, 7)
    }

    // -- parsing --

    #[test]
    fn parses_commands_and_arguments() {
        assert_eq!(parse_command("/start"), Command::Start);
        assert_eq!(parse_command("  Random "), Command::Random);
        assert_eq!(parse_command("theme nature"), Command::Theme("nature".into()));
        assert_eq!(
            parse_command("darker #FFFFFF oops"),
            Command::Adjust(Direction::Darker, vec!["#FFFFFF".into(), "oops".into()])
        );
        assert_eq!(parse_command("save #ff5733"), Command::Save("#ff5733".into()));
        assert_eq!(
            parse_command("save-palette my pick"),
            Command::SavePalette("my pick".into())
        );
        assert_eq!(parse_command("saved-palettes"), Command::SavedPalettes);
        assert_eq!(parse_command("hello there"), Command::Unknown("hello there".into()));
        assert_eq!(parse_command(""), Command::Unknown(String::new()));
    }

    // -- handling --

    #[tokio::test]
    async fn unavailable_sources_render_retry_message() {
        let h = handlers(Arc::new(Offline));
        assert_eq!(h.handle(&Command::Colors).await, UNAVAILABLE);
        assert_eq!(h.handle(&Command::Palettes).await, UNAVAILABLE);
        assert_eq!(h.handle(&Command::Random).await, UNAVAILABLE);
    }

    #[tokio::test]
    async fn colors_render_five_per_line() {
        let h = handlers(Arc::new(SevenColors));
        assert_eq!(
            h.handle(&Command::Colors).await,
            "#010101 #020202 #030303 #040404 #050505\n#060606 #070707"
        );
    }

    #[tokio::test]
    async fn theme_reply_uses_builtin_when_offline() {
        let h = handlers(Arc::new(Offline));
        let reply = h.handle(&Command::Theme("fashion".into())).await;
        assert!(reply.ends_with(&Theme::Fashion.builtin_palette().to_hex_line()));

        let reply = h.handle(&Command::Theme("invalid_theme".into())).await;
        assert!(reply.starts_with("Unknown theme"));
    }

    #[tokio::test]
    async fn adjust_keeps_invalid_entries() {
        let h = handlers(Arc::new(Offline));
        let reply = h
            .handle(&Command::Adjust(
                Direction::Brighter,
                vec!["#646464".into(), "not-a-color".into()],
            ))
            .await;
        assert_eq!(reply, "#828282 not-a-color");
    }

    #[tokio::test]
    async fn save_list_clear_round_trip() {
        let h = handlers(Arc::new(Offline));
        assert_eq!(
            h.handle(&Command::Save("#ff5733".into())).await,
            "Saved #FF5733 to favorites."
        );
        assert_eq!(
            h.handle(&Command::Save("#FF5733".into())).await,
            "#FF5733 is already in your favorites."
        );
        assert!(h
            .handle(&Command::Save("nope".into()))
            .await
            .starts_with("Can't save that"));

        assert_eq!(
            h.handle(&Command::Favorites).await,
            "Your favorites:\n#FF5733"
        );
        assert_eq!(
            h.handle(&Command::Stats).await,
            "Favorite colors: 1\nFavorite palettes: 0"
        );

        assert_eq!(h.handle(&Command::Clear).await, "Favorites cleared.");
        assert!(h.handle(&Command::Favorites).await.starts_with("No favorites yet"));
    }

    #[tokio::test]
    async fn bare_theme_lists_the_themes() {
        let h = handlers(Arc::new(Offline));
        let reply = h.handle(&parse_command("theme")).await;
        assert!(reply.starts_with("Usage: theme <name>"));
        assert!(reply.contains("bank_finance"));
    }

    #[tokio::test]
    async fn save_palette_needs_a_shown_palette() {
        let h = handlers(Arc::new(Offline));
        assert!(h
            .handle(&Command::SavePalette(String::new()))
            .await
            .starts_with("Nothing to save yet"));
        assert!(h.handle(&Command::SavedPalettes).await.starts_with("No saved palettes"));
    }

    #[tokio::test]
    async fn theme_palette_can_be_saved_and_listed() {
        let h = handlers(Arc::new(Offline));
        h.handle(&Command::Theme("nature".into())).await;
        let nature = Theme::Nature.builtin_palette();

        assert_eq!(
            h.handle(&parse_command("save-palette")).await,
            format!("Saved palette `nature`: {nature}")
        );
        assert_eq!(
            h.handle(&parse_command("save-palette forest walk")).await,
            format!("Saved palette `forest walk`: {nature}")
        );

        assert_eq!(
            h.handle(&Command::SavedPalettes).await,
            format!("Your palettes:\nforest walk: {nature}\nnature: {nature}")
        );
        assert_eq!(
            h.handle(&Command::Stats).await,
            "Favorite colors: 0\nFavorite palettes: 2"
        );

        h.handle(&Command::Clear).await;
        assert_eq!(
            h.handle(&Command::Stats).await,
            "Favorite colors: 0\nFavorite palettes: 0"
        );
    }

    #[tokio::test]
    async fn random_palette_is_saved_under_random() {
        let h = handlers(Arc::new(SevenColors));
        assert!(h.handle(&Command::Random).await.starts_with("Random palette"));
        assert!(h
            .handle(&Command::SavePalette(String::new()))
            .await
            .starts_with("Saved palette `random`"));
        assert_eq!(
            h.handle(&Command::Stats).await,
            "Favorite colors: 0\nFavorite palettes: 1"
        );
    }

    #[tokio::test]
    async fn status_reports_each_source() {
        let h = handlers(Arc::new(SevenColors));
        assert_eq!(
            h.handle(&Command::Status).await,
            "Color list: available (7 colors)\nPalette list: unavailable"
        );
    }
}
