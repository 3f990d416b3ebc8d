//! Configuration loading and typed config structures for Supplysim games.
//!
//! A game is described by one YAML file: clock bounds, the document store
//! backend, logging, and the static list of nodes with the components each
//! one owns. Nodes and components are created once from this description
//! when the game is loaded.
//!
//! ```yaml
//! game:
//!   name: "Bike supply chain"
//!   game_days: 3
//!   day_length: 60
//! nodes:
//!   - name: factory
//!     components:
//!       account:
//!         initial:
//!           - debit: [{ amount: 1000, classification: Cash }]
//!       inventory: {}
//!       io: {}
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use supplysim_types::{
    ComponentKind, GoodsLine, GoodsQuantity, InventoryMode, NewsItem, Transaction,
    TransportationStatus,
};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Clock and pacing settings.
    #[serde(default)]
    pub game: GameSettings,

    /// Document store backend.
    #[serde(default)]
    pub store: StoreConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// The economic actors of the game.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

impl GameConfig {
    /// Load and validate configuration from a YAML file.
    ///
    /// `DRAGONFLY_URL` in the environment overrides `store.dragonfly_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.store.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Look up a node by name.
    pub fn node(&self, name: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Check bounds, node-name uniqueness, and cross-node references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.game_days == 0 {
            return invalid("game.game_days must be at least 1");
        }
        if self.game.day_length == 0 {
            return invalid("game.day_length must be at least 1");
        }
        if self.game.tick_interval_ms == 0 {
            return invalid("game.tick_interval_ms must be at least 1");
        }

        let mut names = BTreeSet::new();
        for node in &self.nodes {
            if node.name.is_empty() {
                return invalid("node names must not be empty");
            }
            if !names.insert(node.name.as_str()) {
                return invalid(&format!("duplicate node name '{}'", node.name));
            }
        }

        for node in &self.nodes {
            self.validate_node(node, &names)?;
        }
        Ok(())
    }

    fn validate_node(&self, node: &NodeConfig, names: &BTreeSet<&str>) -> Result<(), ConfigError> {
        let c = &node.components;
        let known = |other: &String, role: &str| -> Result<(), ConfigError> {
            if names.contains(other.as_str()) {
                Ok(())
            } else {
                invalid(&format!(
                    "node '{}' lists unknown {role} '{other}'",
                    node.name
                ))
            }
        };
        let has = |other: &String, kind: ComponentKind| -> Result<(), ConfigError> {
            if self.node(other).is_some_and(|n| n.components.has(kind)) {
                Ok(())
            } else {
                invalid(&format!(
                    "node '{}' refers to '{other}', which has no {kind} component",
                    node.name
                ))
            }
        };

        if c.inventory.is_some() && c.account.is_none() {
            return invalid(&format!(
                "node '{}': an inventory needs an account component",
                node.name
            ));
        }
        if c.io.is_some() && c.inventory.is_none() {
            return invalid(&format!(
                "node '{}': an io channel needs an inventory component",
                node.name
            ));
        }

        if let Some(inventory) = &c.inventory {
            for (good, rate) in &inventory.storage_cost.goods {
                if rate.batch_size == 0 {
                    return invalid(&format!(
                        "node '{}': storage batch_size for '{good}' must be at least 1",
                        node.name
                    ));
                }
            }
        }
        if let Some(io) = &c.io {
            for (good, rate) in &io.transportation_cost {
                if rate.batch_size == 0 {
                    return invalid(&format!(
                        "node '{}': transportation batch_size for '{good}' must be at least 1",
                        node.name
                    ));
                }
            }
        }
        if let Some(market) = &c.bidding_market {
            for other in market.upstreams.iter().chain(&market.downstreams) {
                known(other, "bidding participant")?;
            }
            if market.penalty_ratio < Decimal::ZERO || market.compensation_ratio < Decimal::ZERO {
                return invalid(&format!(
                    "node '{}': penalty and compensation ratios must not be negative",
                    node.name
                ));
            }
        }
        if let Some(receiver) = &c.bidding_receiver {
            for other in &receiver.markets {
                has(other, ComponentKind::BiddingMarket)?;
            }
            if c.account.is_none() {
                return invalid(&format!(
                    "node '{}': a bidding receiver needs an account component",
                    node.name
                ));
            }
        }
        if let Some(market) = &c.market {
            for other in &market.upstreams {
                known(other, "market upstream")?;
            }
        }
        if let Some(receiver) = &c.market_receiver {
            for other in &receiver.markets {
                has(other, ComponentKind::Market)?;
            }
        }
        if let Some(assembly) = &c.assembly {
            for other in &assembly.receivers {
                has(other, ComponentKind::Inventory)?;
            }
        }
        Ok(())
    }
}

fn invalid<T>(reason: &str) -> Result<T, ConfigError> {
    Err(ConfigError::Invalid {
        reason: reason.to_owned(),
    })
}

// ---------------------------------------------------------------------------
// Game, store, logging
// ---------------------------------------------------------------------------

/// Clock bounds and tick pacing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameSettings {
    /// Human-readable game name.
    #[serde(default = "default_game_name")]
    pub name: String,

    /// Number of playable days.
    #[serde(default = "default_game_days")]
    pub game_days: u32,

    /// Ticks per working day.
    #[serde(default = "default_day_length")]
    pub day_length: u32,

    /// Real-time milliseconds per tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            name: default_game_name(),
            game_days: default_game_days(),
            day_length: default_day_length(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Which document store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map; state is lost on exit.
    #[default]
    Memory,
    /// `Dragonfly` (Redis-compatible) server.
    Dragonfly,
}

/// Document store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StoreBackend,

    /// `Dragonfly` connection URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,
}

impl StoreConfig {
    /// Apply `DRAGONFLY_URL` from the environment, if set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.dragonfly_url = val;
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            dragonfly_url: default_dragonfly_url(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes and components
// ---------------------------------------------------------------------------

/// One economic actor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NodeConfig {
    /// Unique node name.
    pub name: String,

    /// Components the node owns.
    #[serde(default)]
    pub components: ComponentsConfig,
}

/// The optional components of a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ComponentsConfig {
    /// Ledger.
    #[serde(default)]
    pub account: Option<AccountConfig>,
    /// Stock ledger.
    #[serde(default)]
    pub inventory: Option<InventoryConfig>,
    /// Logistics channel.
    #[serde(default)]
    pub io: Option<IoConfig>,
    /// Negotiation market hosted by this node.
    #[serde(default)]
    pub bidding_market: Option<BiddingMarketConfig>,
    /// Proxy to negotiation markets hosted elsewhere.
    #[serde(default)]
    pub bidding_receiver: Option<BiddingReceiverConfig>,
    /// Spot market hosted by this node.
    #[serde(default)]
    pub market: Option<MarketConfig>,
    /// Proxy for selling into spot markets.
    #[serde(default)]
    pub market_receiver: Option<MarketReceiverConfig>,
    /// Bill-of-materials production.
    #[serde(default)]
    pub assembly: Option<AssemblyConfig>,
}

impl ComponentsConfig {
    /// Whether a component of `kind` is configured.
    pub const fn has(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Account => self.account.is_some(),
            ComponentKind::Inventory => self.inventory.is_some(),
            ComponentKind::Io => self.io.is_some(),
            ComponentKind::BiddingMarket => self.bidding_market.is_some(),
            ComponentKind::BiddingReceiver => self.bidding_receiver.is_some(),
            ComponentKind::Market => self.market.is_some(),
            ComponentKind::MarketReceiver => self.market_receiver.is_some(),
            ComponentKind::Assembly => self.assembly.is_some(),
        }
    }

    /// Configured component kinds, in registry order.
    pub fn kinds(&self) -> Vec<ComponentKind> {
        ComponentKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }
}

/// Ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AccountConfig {
    /// Seed entries posted once when the ledger is created. They are
    /// always accepted unbalanced.
    #[serde(default)]
    pub initial: Vec<Transaction>,
}

/// Stock ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct InventoryConfig {
    /// Stock-keeping mode.
    #[serde(default)]
    pub mode: InventoryMode,

    /// End-of-day warehousing charge.
    #[serde(default)]
    pub storage_cost: StorageCostConfig,
}

/// Warehousing charge table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StorageCostConfig {
    /// Whether the charge is applied at all.
    #[serde(default)]
    pub enabled: bool,

    /// Per-good rate. Goods without a rate are stored free.
    #[serde(default)]
    pub goods: BTreeMap<String, StorageRate>,
}

/// Warehousing rate of one good: `ceil(unit / batch_size) * cost_per_batch`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageRate {
    /// Units per charged batch.
    pub batch_size: u64,
    /// Cost of one batch.
    pub cost_per_batch: Decimal,
}

/// Logistics channel configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IoConfig {
    /// Status of newly imported shipments. `DELIVERING` defers the stock
    /// import by `transportation_time` ticks.
    #[serde(default)]
    pub transportation_status: TransportationStatus,

    /// Transit time in ticks for delivering shipments.
    #[serde(default)]
    pub transportation_time: u32,

    /// Optional import allow-list with remaining per-good quota.
    #[serde(default)]
    pub available_goods: Option<BTreeMap<String, u64>>,

    /// Per-good transit cost paid by the exporter.
    #[serde(default)]
    pub transportation_cost: BTreeMap<String, TransportRate>,
}

/// Transit rate of one good: `ceil(unit / batch_size) * unit_cost`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransportRate {
    /// Units per charged batch.
    pub batch_size: u64,
    /// Cost of one batch.
    pub unit_cost: Decimal,
}

/// Negotiation market configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BiddingMarketConfig {
    /// Nodes that sell into this market.
    #[serde(default)]
    pub upstreams: Vec<String>,

    /// Nodes that buy from this market.
    #[serde(default)]
    pub downstreams: Vec<String>,

    /// Share of the price the breaking party pays.
    #[serde(default)]
    pub penalty_ratio: Decimal,

    /// Share of the price the counterparty receives on breakoff.
    #[serde(default)]
    pub compensation_ratio: Decimal,

    /// Scheduled news.
    #[serde(default)]
    pub news: Vec<NewsItem>,
}

/// Negotiation market proxy configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BiddingReceiverConfig {
    /// Nodes hosting the markets this node trades on.
    #[serde(default)]
    pub markets: Vec<String>,
}

/// Spot market configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MarketConfig {
    /// Nodes allowed to sell into this market.
    #[serde(default)]
    pub upstreams: Vec<String>,

    /// Initial needs board.
    #[serde(default)]
    pub needs: Vec<GoodsLine>,

    /// Scheduled news; items carrying `needs` replace the board.
    #[serde(default)]
    pub news: Vec<NewsItem>,
}

/// Spot market proxy configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MarketReceiverConfig {
    /// Nodes hosting the markets this node sells into.
    #[serde(default)]
    pub markets: Vec<String>,
}

/// Assembly configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssemblyConfig {
    /// Nodes whose stock this assembly may transform.
    #[serde(default)]
    pub receivers: Vec<String>,

    /// Components consumed per unit of each product.
    #[serde(default)]
    pub bill_of_materials: BTreeMap<String, Vec<GoodsQuantity>>,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn default_game_name() -> String {
    "supplysim".to_owned()
}

const fn default_game_days() -> u32 {
    5
}

const fn default_day_length() -> u32 {
    60
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_dragonfly_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_log_level() -> String {
    "info".to_owned()
}
