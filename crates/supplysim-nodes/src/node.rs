//! A named participant owning a set of components.
//!
//! Components are looked up by kind. Operations that span several of a
//! node's own components (an import landing in stock, an export posting
//! transit cost) live here; operations that span nodes live in the engine.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use supplysim_core::Notifier;
use supplysim_core::config::NodeConfig;
use supplysim_store::{Document, DocumentStore};
use supplysim_types::{
    BiddingItem, Classification, ComponentKind, EngineId, GameTime, GoodsLine,
    GoodsQuantity, InventoryMode, IoJournalItem, NodeId, ShipmentId, TransportationStatus,
};

use crate::account::Account;
use crate::assembly::Assembly;
use crate::bidding::BiddingMarket;
use crate::error::NodeError;
use crate::inventory::Inventory;
use crate::io::Io;
use crate::market::Market;
use crate::receiver::{BiddingReceiver, MarketReceiver};

/// Store key of a node component.
pub fn component_key(engine_id: EngineId, node: &str, kind: ComponentKind) -> String {
    format!("{engine_id}:{node}:{kind}")
}

/// One component, tagged by kind.
#[derive(Debug)]
pub enum Component {
    /// Ledger.
    Account(Box<Account>),
    /// Stock ledger.
    Inventory(Box<Inventory>),
    /// Logistics channel.
    Io(Box<Io>),
    /// Negotiation market.
    BiddingMarket(Box<BiddingMarket>),
    /// Negotiation market proxy.
    BiddingReceiver(BiddingReceiver),
    /// Spot market.
    Market(Box<Market>),
    /// Spot market proxy.
    MarketReceiver(MarketReceiver),
    /// Bill-of-materials production.
    Assembly(Box<Assembly>),
}

impl Component {
    /// The component's kind.
    pub const fn kind(&self) -> ComponentKind {
        match self {
            Self::Account(_) => ComponentKind::Account,
            Self::Inventory(_) => ComponentKind::Inventory,
            Self::Io(_) => ComponentKind::Io,
            Self::BiddingMarket(_) => ComponentKind::BiddingMarket,
            Self::BiddingReceiver(_) => ComponentKind::BiddingReceiver,
            Self::Market(_) => ComponentKind::Market,
            Self::MarketReceiver(_) => ComponentKind::MarketReceiver,
            Self::Assembly(_) => ComponentKind::Assembly,
        }
    }
}

#[derive(Debug, Default)]
struct Components {
    account: Option<Account>,
    inventory: Option<Inventory>,
    io: Option<Io>,
    bidding_market: Option<BiddingMarket>,
    bidding_receiver: Option<BiddingReceiver>,
    market: Option<Market>,
    market_receiver: Option<MarketReceiver>,
    assembly: Option<Assembly>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeIdentity {
    id: NodeId,
    name: String,
}

/// Read-only summary of a node for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Stable node id.
    pub id: NodeId,
    /// Node name.
    pub name: String,
    /// Owned component kinds.
    pub components: Vec<ComponentKind>,
    /// Ledger balances, if the node has an account.
    pub balances: Option<BTreeMap<Classification, Decimal>>,
    /// Bankruptcy flag, if the node has an account.
    pub bankrupt: Option<bool>,
    /// Units on hand per good, if the node has an inventory.
    pub storage: Option<BTreeMap<String, u64>>,
    /// Shipments still on their way, if the node has an io.
    pub in_transit: Option<Vec<IoJournalItem>>,
    /// Non-terminal contracts, if the node hosts a bidding market.
    pub open_bidding: Option<Vec<BiddingItem>>,
    /// Board, if the node hosts a spot market.
    pub needs: Option<Vec<GoodsLine>>,
}

/// A game participant.
#[derive(Debug)]
pub struct Node {
    identity: Document<NodeIdentity>,
    components: Components,
}

fn missing(node: &str, kind: ComponentKind) -> NodeError {
    NodeError::MissingComponent {
        node: node.to_owned(),
        kind,
    }
}

macro_rules! accessors {
    ($($field:ident, $field_mut:ident: $ty:ty => $kind:ident;)*) => {
        $(
            #[doc = concat!("The node's `", stringify!($field), "` component.")]
            ///
            /// # Errors
            ///
            /// Returns [`NodeError::MissingComponent`] if the node has none.
            pub fn $field(&self) -> Result<&$ty, NodeError> {
                self.components
                    .$field
                    .as_ref()
                    .ok_or_else(|| missing(self.name(), ComponentKind::$kind))
            }

            #[doc = concat!("Mutable access to the node's `", stringify!($field), "` component.")]
            ///
            /// # Errors
            ///
            /// Returns [`NodeError::MissingComponent`] if the node has none.
            pub fn $field_mut(&mut self) -> Result<&mut $ty, NodeError> {
                let name = &self.identity.state().name;
                self.components
                    .$field
                    .as_mut()
                    .ok_or_else(|| missing(name, ComponentKind::$kind))
            }
        )*
    };
}

impl Node {
    /// Load or create the node and every configured component.
    ///
    /// Component documents live under `"{engine_id}:{name}:{kind}"`.
    /// Relays on `notifier` must be in place before this is called, since
    /// emitters capture them when built.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] if any component fails to load.
    pub async fn load(
        store: &DocumentStore,
        engine_id: EngineId,
        config: &NodeConfig,
        notifier: &mut Notifier,
    ) -> Result<Self, NodeError> {
        let name = config.name.as_str();
        let key = |kind| component_key(engine_id, name, kind);
        let owned = name.to_owned();
        let identity = Document::load_or_create(
            store.clone(),
            format!("{engine_id}:{name}:node"),
            move || NodeIdentity {
                id: NodeId::new(),
                name: owned,
            },
        )
        .await?;

        let mut node = Self {
            identity,
            components: Components::default(),
        };
        let c = &config.components;

        if let Some(cfg) = &c.account {
            let account = Account::load(store.clone(), key(ComponentKind::Account), cfg).await?;
            node.attach(Component::Account(Box::new(account)))?;
        }
        if let Some(cfg) = &c.inventory {
            let inventory = Inventory::load(
                store.clone(),
                key(ComponentKind::Inventory),
                cfg.clone(),
                notifier.emitter(name, ComponentKind::Inventory),
            )
            .await?;
            node.attach(Component::Inventory(Box::new(inventory)))?;
        }
        if let Some(cfg) = &c.io {
            let io = Io::load(
                store.clone(),
                key(ComponentKind::Io),
                cfg.clone(),
                notifier.emitter(name, ComponentKind::Io),
            )
            .await?;
            node.attach(Component::Io(Box::new(io)))?;
        }
        if let Some(cfg) = &c.bidding_market {
            let market = BiddingMarket::load(
                store.clone(),
                key(ComponentKind::BiddingMarket),
                cfg.clone(),
                notifier.emitter(name, ComponentKind::BiddingMarket),
            )
            .await?;
            node.attach(Component::BiddingMarket(Box::new(market)))?;
        }
        if let Some(cfg) = &c.bidding_receiver {
            notifier.register(name, ComponentKind::BiddingReceiver);
            node.attach(Component::BiddingReceiver(BiddingReceiver::new(cfg.clone())))?;
        }
        if let Some(cfg) = &c.market {
            let market = Market::load(
                store.clone(),
                key(ComponentKind::Market),
                cfg.clone(),
                notifier.emitter(name, ComponentKind::Market),
            )
            .await?;
            node.attach(Component::Market(Box::new(market)))?;
        }
        if let Some(cfg) = &c.market_receiver {
            notifier.register(name, ComponentKind::MarketReceiver);
            node.attach(Component::MarketReceiver(MarketReceiver::new(cfg.clone())))?;
        }
        if let Some(cfg) = &c.assembly {
            let assembly = Assembly::load(
                store.clone(),
                key(ComponentKind::Assembly),
                cfg.clone(),
                notifier.emitter(name, ComponentKind::Assembly),
            )
            .await?;
            node.attach(Component::Assembly(Box::new(assembly)))?;
        }

        info!(node = name, id = %node.id(), components = ?node.kinds(), "Node loaded");
        Ok(node)
    }

    /// Attach a component.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::AlreadyInitialized`] if the node already owns a
    /// component of that kind.
    pub fn attach(&mut self, component: Component) -> Result<(), NodeError> {
        let kind = component.kind();
        if self.has(kind) {
            return Err(NodeError::AlreadyInitialized {
                node: self.name().to_owned(),
                kind,
            });
        }
        let c = &mut self.components;
        match component {
            Component::Account(a) => c.account = Some(*a),
            Component::Inventory(i) => c.inventory = Some(*i),
            Component::Io(i) => c.io = Some(*i),
            Component::BiddingMarket(m) => c.bidding_market = Some(*m),
            Component::BiddingReceiver(r) => c.bidding_receiver = Some(r),
            Component::Market(m) => c.market = Some(*m),
            Component::MarketReceiver(r) => c.market_receiver = Some(r),
            Component::Assembly(a) => c.assembly = Some(*a),
        }
        Ok(())
    }

    /// Stable node id.
    pub fn id(&self) -> NodeId {
        self.identity.state().id
    }

    /// Node name.
    pub fn name(&self) -> &str {
        &self.identity.state().name
    }

    /// Whether the node owns a component of `kind`.
    pub const fn has(&self, kind: ComponentKind) -> bool {
        let c = &self.components;
        match kind {
            ComponentKind::Account => c.account.is_some(),
            ComponentKind::Inventory => c.inventory.is_some(),
            ComponentKind::Io => c.io.is_some(),
            ComponentKind::BiddingMarket => c.bidding_market.is_some(),
            ComponentKind::BiddingReceiver => c.bidding_receiver.is_some(),
            ComponentKind::Market => c.market.is_some(),
            ComponentKind::MarketReceiver => c.market_receiver.is_some(),
            ComponentKind::Assembly => c.assembly.is_some(),
        }
    }

    /// Owned component kinds in canonical order.
    pub fn kinds(&self) -> Vec<ComponentKind> {
        ComponentKind::ALL
            .iter()
            .copied()
            .filter(|kind| self.has(*kind))
            .collect()
    }

    accessors! {
        account, account_mut: Account => Account;
        inventory, inventory_mut: Inventory => Inventory;
        io, io_mut: Io => Io;
        bidding_market, bidding_market_mut: BiddingMarket => BiddingMarket;
        bidding_receiver, bidding_receiver_mut: BiddingReceiver => BiddingReceiver;
        market, market_mut: Market => Market;
        market_receiver, market_receiver_mut: MarketReceiver => MarketReceiver;
        assembly, assembly_mut: Assembly => Assembly;
    }

    /// Whether the node's ledger reads bankrupt. Nodes without an account
    /// never are.
    pub fn is_bankrupt(&self) -> bool {
        self.components
            .account
            .as_ref()
            .is_some_and(Account::is_bankrupt)
    }

    /// Accept a shipment from `from`.
    ///
    /// The io records it first; if it arrives immediately the goods land in
    /// stock and `Inventory`/`AccountsPayable` is posted. A delivering shipment
    /// lands later through [`Node::complete_shipment`].
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::MissingComponent`] unless the node has io,
    /// inventory and account, or the io/inventory rejection.
    pub async fn import_goods(
        &mut self,
        from: &str,
        goods: &[GoodsLine],
        price: Decimal,
        game_time: GameTime,
    ) -> Result<IoJournalItem, NodeError> {
        check_price(price)?;
        let name = &self.identity.state().name;
        let c = &mut self.components;
        let io = c.io.as_mut().ok_or_else(|| missing(name, ComponentKind::Io))?;
        let inventory = c
            .inventory
            .as_mut()
            .ok_or_else(|| missing(name, ComponentKind::Inventory))?;
        let account = c
            .account
            .as_mut()
            .ok_or_else(|| missing(name, ComponentKind::Account))?;

        let item = io.import(from, goods, price, game_time).await?;
        if item.transportation_status == TransportationStatus::Completed {
            inventory
                .import(account, goods, price, Some(from), game_time)
                .await?;
        }
        Ok(item)
    }

    /// Check that [`Node::import_goods`] would accept `goods` for `price`,
    /// without changing anything.
    ///
    /// # Errors
    ///
    /// Returns the error `import_goods` would fail with before recording.
    pub fn check_import(&self, goods: &[GoodsLine], price: Decimal) -> Result<(), NodeError> {
        check_price(price)?;
        let io = self.io()?;
        self.inventory()?;
        self.account()?;
        io.check_import(goods)
    }

    /// Land a delivering shipment in stock.
    ///
    /// Returns `false` if it had already arrived, in which case nothing is
    /// posted again.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::ShipmentNotFound`] for an unknown shipment, or
    /// a missing-component or posting error.
    pub async fn complete_shipment(
        &mut self,
        shipment: ShipmentId,
        game_time: GameTime,
    ) -> Result<bool, NodeError> {
        let name = &self.identity.state().name;
        let c = &mut self.components;
        let io = c.io.as_mut().ok_or_else(|| missing(name, ComponentKind::Io))?;
        let inventory = c
            .inventory
            .as_mut()
            .ok_or_else(|| missing(name, ComponentKind::Inventory))?;
        let account = c
            .account
            .as_mut()
            .ok_or_else(|| missing(name, ComponentKind::Account))?;

        let Some(item) = io.complete(shipment, game_time).await? else {
            debug!(node = name.as_str(), %shipment, "Shipment already arrived");
            return Ok(false);
        };
        inventory
            .import(account, &item.goods, item.price, Some(&item.from), game_time)
            .await?;
        Ok(true)
    }

    /// Send `goods` to `to` for `price`.
    ///
    /// Checks stock (perpetual mode) and the goods before changing
    /// anything, then records the shipment, removes the goods FIFO with
    /// their postings, and posts the transit cost to
    /// `TransportationCost`/`Cash`. The counterparty's import is the caller's
    /// job.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::OutOfStock`], [`NodeError::DuplicateGoods`] or
    /// a missing-component error with nothing changed.
    pub async fn export_goods(
        &mut self,
        to: &str,
        goods: &[GoodsLine],
        price: Decimal,
        game_time: GameTime,
    ) -> Result<IoJournalItem, NodeError> {
        check_price(price)?;
        let name = &self.identity.state().name;
        let c = &mut self.components;
        let io = c.io.as_mut().ok_or_else(|| missing(name, ComponentKind::Io))?;
        let inventory = c
            .inventory
            .as_mut()
            .ok_or_else(|| missing(name, ComponentKind::Inventory))?;
        let account = c
            .account
            .as_mut()
            .ok_or_else(|| missing(name, ComponentKind::Account))?;

        io.prepare_export(to, goods, price, game_time)?;
        if inventory.mode() == InventoryMode::Perpetual {
            inventory.cost_of_sales(&quantities(goods))?;
        }

        let item = io.export(to, goods, price, game_time).await?;
        inventory
            .export(account, goods, price, Some(to), game_time)
            .await?;
        account
            .transfer(
                item.transportation_cost,
                Classification::TransportationCost,
                Classification::Cash,
                Some(to),
                game_time,
            )
            .await?;
        Ok(item)
    }

    /// Stock goods directly, posting `Inventory`/`AccountsPayable`.
    ///
    /// # Errors
    ///
    /// Returns a missing-component or inventory error.
    pub async fn stock_import(
        &mut self,
        goods: &[GoodsLine],
        price: Decimal,
        counter_object: Option<&str>,
        game_time: GameTime,
    ) -> Result<(), NodeError> {
        check_price(price)?;
        let (inventory, account) = self.stock_parts()?;
        inventory
            .import(account, goods, price, counter_object, game_time)
            .await
    }

    /// Remove goods directly, posting cost of sales and the sale. Returns
    /// the FIFO cost.
    ///
    /// # Errors
    ///
    /// Returns a missing-component or inventory error.
    pub async fn stock_export(
        &mut self,
        goods: &[GoodsLine],
        price: Decimal,
        counter_object: Option<&str>,
        game_time: GameTime,
    ) -> Result<Decimal, NodeError> {
        check_price(price)?;
        let (inventory, account) = self.stock_parts()?;
        inventory
            .export(account, goods, price, counter_object, game_time)
            .await
    }

    /// Charge the day's warehousing cost. Nodes without inventory or
    /// account are charged nothing.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] if posting fails.
    pub async fn count_storage_cost(&mut self, game_time: GameTime) -> Result<Decimal, NodeError> {
        let c = &mut self.components;
        match (c.inventory.as_mut(), c.account.as_mut()) {
            (Some(inventory), Some(account)) => {
                inventory.count_storage_cost(account, game_time).await
            }
            _ => Ok(Decimal::ZERO),
        }
    }

    /// Check that this node may act on the negotiation market `market`.
    ///
    /// With `require_solvent`, a bankrupt node is refused as well; this
    /// applies to publishing and signing.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::MissingComponent`] without a bidding receiver,
    /// [`NodeError::NotRegistered`] for an unlisted market, or
    /// [`NodeError::Bankrupt`].
    pub fn check_bidding_access(&self, market: &str, require_solvent: bool) -> Result<(), NodeError> {
        self.bidding_receiver()?.check_market(market)?;
        if require_solvent && self.is_bankrupt() {
            return Err(NodeError::Bankrupt {
                node: self.name().to_owned(),
            });
        }
        Ok(())
    }

    /// Check that this node may sell into the spot market `market`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::MissingComponent`] without a market receiver or
    /// [`NodeError::NotRegistered`] for an unlisted market.
    pub fn check_market_access(&self, market: &str) -> Result<(), NodeError> {
        self.market_receiver()?.check_market(market)
    }

    /// Convert `components` into `unit` of `product` in this node's stock.
    ///
    /// The components leave at their FIFO cost and the product enters at
    /// that same total, so the assembler books no margin. When the cost
    /// does not divide evenly the last unit carries the remainder in its
    /// own lot, keeping the lots' value equal to the cost. In periodic mode
    /// both movements are no-ops and the cost is zero. Returns the cost.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::OutOfStock`] with nothing changed when a
    /// component is short, or a missing-component error.
    pub async fn assemble_stock(
        &mut self,
        assembler: &str,
        product: &str,
        unit: u64,
        components: &[GoodsQuantity],
        game_time: GameTime,
    ) -> Result<Decimal, NodeError> {
        let (inventory, account) = self.stock_parts()?;
        if inventory.mode() == InventoryMode::Periodic {
            return Ok(Decimal::ZERO);
        }
        let cost = inventory.cost_of_sales(components)?;
        let parts: Vec<GoodsLine> = components
            .iter()
            .map(|part| GoodsLine::new(part.name.clone(), part.unit, Decimal::ZERO))
            .collect();
        let lots = product_lots(product, unit, cost)?;

        inventory
            .export(account, &parts, cost, Some(assembler), game_time)
            .await?;
        for lot in &lots {
            let price = lot
                .unit_price
                .checked_mul(Decimal::from(lot.unit))
                .ok_or(NodeError::Overflow {
                    context: "pricing an assembled lot",
                })?;
            inventory
                .import(account, std::slice::from_ref(lot), price, Some(assembler), game_time)
                .await?;
        }
        Ok(cost)
    }

    /// Snapshot for clients.
    pub fn info(&self) -> NodeInfo {
        let c = &self.components;
        NodeInfo {
            id: self.id(),
            name: self.name().to_owned(),
            components: self.kinds(),
            balances: c.account.as_ref().map(Account::balances),
            bankrupt: c.account.as_ref().map(Account::is_bankrupt),
            storage: c.inventory.as_ref().map(Inventory::storage),
            in_transit: c.io.as_ref().map(|io| io.in_transit().cloned().collect()),
            open_bidding: c.bidding_market.as_ref().map(|m| {
                m.items()
                    .iter()
                    .filter(|item| !item.stage.is_terminal())
                    .cloned()
                    .collect()
            }),
            needs: c.market.as_ref().map(|m| m.needs().to_vec()),
        }
    }

    fn stock_parts(&mut self) -> Result<(&mut Inventory, &mut Account), NodeError> {
        let name = &self.identity.state().name;
        let c = &mut self.components;
        let inventory = c
            .inventory
            .as_mut()
            .ok_or_else(|| missing(name, ComponentKind::Inventory))?;
        let account = c
            .account
            .as_mut()
            .ok_or_else(|| missing(name, ComponentKind::Account))?;
        Ok((inventory, account))
    }
}

/// Lots of `unit` products worth exactly `cost` in total.
fn product_lots(product: &str, unit: u64, cost: Decimal) -> Result<Vec<GoodsLine>, NodeError> {
    let overflow = || NodeError::Overflow {
        context: "pricing an assembled unit",
    };
    let units = Decimal::from(unit);
    let even = cost.checked_div(units).ok_or_else(overflow)?;
    if even.checked_mul(units) == Some(cost) {
        return Ok(vec![GoodsLine::new(product, unit, even)]);
    }

    let scale = cost.scale().saturating_add(6).min(28);
    let base = even.round_dp_with_strategy(scale, RoundingStrategy::ToZero);
    let rest = unit.saturating_sub(1);
    let last = base
        .checked_mul(Decimal::from(rest))
        .and_then(|spent| cost.checked_sub(spent))
        .ok_or_else(overflow)?;
    Ok(vec![
        GoodsLine::new(product, rest, base),
        GoodsLine::new(product, 1, last),
    ])
}

fn check_price(price: Decimal) -> Result<(), NodeError> {
    if price.is_sign_negative() {
        return Err(NodeError::invalid(format!("price {price} is negative")));
    }
    Ok(())
}

fn quantities(goods: &[GoodsLine]) -> Vec<GoodsQuantity> {
    goods
        .iter()
        .map(|line| GoodsQuantity {
            name: line.name.clone(),
            unit: line.unit,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use supplysim_core::config::{
        AccountConfig, ComponentsConfig, InventoryConfig, IoConfig, TransportRate,
    };

    use super::*;

    const T: GameTime = GameTime::working(1, 0);

    fn config(name: &str, transportation_time: u32) -> NodeConfig {
        let mut transportation_cost = BTreeMap::new();
        transportation_cost.insert(
            "Wheel".to_owned(),
            TransportRate {
                batch_size: 4,
                unit_cost: dec!(2),
            },
        );
        NodeConfig {
            name: name.to_owned(),
            components: ComponentsConfig {
                account: Some(AccountConfig::default()),
                inventory: Some(InventoryConfig::default()),
                io: Some(IoConfig {
                    transportation_time,
                    transportation_status: TransportationStatus::Delivering,
                    transportation_cost,
                    ..IoConfig::default()
                }),
                ..ComponentsConfig::default()
            },
        }
    }

    async fn node(name: &str, transportation_time: u32) -> Node {
        let mut notifier = Notifier::new(EngineId::new());
        Node::load(
            &DocumentStore::memory(),
            EngineId::new(),
            &config(name, transportation_time),
            &mut notifier,
        )
        .await
        .unwrap()
    }

    fn wheels(unit: u64, unit_price: Decimal) -> Vec<GoodsLine> {
        vec![GoodsLine::new("Wheel", unit, unit_price)]
    }

    #[tokio::test]
    async fn missing_component_is_reported() {
        let n = node("factory", 0).await;
        assert!(matches!(
            n.market(),
            Err(NodeError::MissingComponent {
                kind: ComponentKind::Market,
                ..
            })
        ));
        assert_eq!(
            n.kinds(),
            vec![ComponentKind::Account, ComponentKind::Inventory, ComponentKind::Io]
        );
    }

    #[tokio::test]
    async fn attaching_twice_is_rejected() {
        let mut n = node("factory", 0).await;
        let account = Account::load(
            DocumentStore::memory(),
            "x".to_owned(),
            &AccountConfig::default(),
        )
        .await
        .unwrap();
        assert!(matches!(
            n.attach(Component::Account(Box::new(account))),
            Err(NodeError::AlreadyInitialized { .. })
        ));
    }

    #[tokio::test]
    async fn immediate_import_lands_in_stock() {
        let mut n = node("factory", 0).await;
        let item = n
            .import_goods("supplier", &wheels(10, dec!(10)), dec!(100), T)
            .await
            .unwrap();
        assert_eq!(item.transportation_status, TransportationStatus::Completed);
        let inventory = n.inventory().unwrap();
        assert_eq!(inventory.storage_unit("Wheel"), 10);
        assert_eq!(
            n.account().unwrap().balance(Classification::Inventory),
            dec!(100)
        );
    }

    #[tokio::test]
    async fn delivering_import_lands_once() {
        let mut n = node("factory", 3).await;
        let item = n
            .import_goods("supplier", &wheels(10, dec!(10)), dec!(100), T)
            .await
            .unwrap();
        assert_eq!(item.transportation_status, TransportationStatus::Delivering);
        assert_eq!(n.inventory().unwrap().storage_unit("Wheel"), 0);

        assert!(n.complete_shipment(item.id, GameTime::working(1, 3)).await.unwrap());
        assert!(!n.complete_shipment(item.id, GameTime::working(1, 4)).await.unwrap());
        assert_eq!(n.inventory().unwrap().storage_unit("Wheel"), 10);
        assert_eq!(
            n.account().unwrap().balance(Classification::AccountsPayable),
            dec!(-100)
        );
    }

    #[tokio::test]
    async fn export_posts_fifo_cost_and_transit() {
        let mut n = node("factory", 0).await;
        n.import_goods("supplier", &wheels(10, dec!(10)), dec!(100), T)
            .await
            .unwrap();
        let item = n
            .export_goods("retailer", &wheels(5, dec!(30)), dec!(150), T)
            .await
            .unwrap();

        // two batches of four
        assert_eq!(item.transportation_cost, dec!(4));
        let account = n.account().unwrap();
        assert_eq!(account.balance(Classification::CostOfSales), dec!(50));
        assert_eq!(account.balance(Classification::Sales), dec!(-150));
        assert_eq!(
            account.balance(Classification::TransportationCost),
            item.transportation_cost
        );
        assert_eq!(n.inventory().unwrap().storage_unit("Wheel"), 5);
    }

    #[tokio::test]
    async fn export_short_stock_changes_nothing() {
        let mut n = node("factory", 0).await;
        n.import_goods("supplier", &wheels(2, dec!(10)), dec!(20), T)
            .await
            .unwrap();
        let journal_before = n.io().unwrap().journal().len();
        assert!(matches!(
            n.export_goods("retailer", &wheels(5, dec!(30)), dec!(150), T)
                .await,
            Err(NodeError::OutOfStock { .. })
        ));
        assert_eq!(n.io().unwrap().journal().len(), journal_before);
        assert_eq!(n.inventory().unwrap().storage_unit("Wheel"), 2);
    }

    #[tokio::test]
    async fn assembling_moves_cost_into_product() {
        let mut n = node("factory", 0).await;
        n.import_goods("supplier", &wheels(4, dec!(10)), dec!(40), T)
            .await
            .unwrap();
        let parts = vec![GoodsQuantity {
            name: "Wheel".to_owned(),
            unit: 4,
        }];
        let cost = n.assemble_stock("factory", "Cart", 2, &parts, T).await.unwrap();
        assert_eq!(cost, dec!(40));
        let inventory = n.inventory().unwrap();
        assert_eq!(inventory.storage_unit("Wheel"), 0);
        assert_eq!(inventory.storage_unit("Cart"), 2);
        assert_eq!(inventory.lots("Cart")[0].unit_price, dec!(20));
        assert_eq!(
            n.account().unwrap().balance(Classification::Inventory),
            dec!(40)
        );
    }

    #[tokio::test]
    async fn uneven_assembly_cost_stays_whole() {
        let mut n = node("factory", 0).await;
        n.import_goods("supplier", &wheels(1, dec!(10)), dec!(10), T)
            .await
            .unwrap();
        let parts = vec![GoodsQuantity {
            name: "Wheel".to_owned(),
            unit: 1,
        }];
        let cost = n.assemble_stock("factory", "Cart", 3, &parts, T).await.unwrap();
        assert_eq!(cost, dec!(10));

        let inventory = n.inventory().unwrap();
        assert_eq!(inventory.storage_unit("Cart"), 3);
        assert_eq!(inventory.lots("Cart").len(), 2);
        let carts = [GoodsQuantity {
            name: "Cart".to_owned(),
            unit: 3,
        }];
        assert_eq!(inventory.cost_of_sales(&carts).unwrap(), dec!(10));
        assert_eq!(
            n.account().unwrap().balance(Classification::Inventory),
            dec!(10)
        );
    }

    #[tokio::test]
    async fn info_lists_owned_parts_only() {
        let n = node("factory", 0).await;
        let info = n.info();
        assert_eq!(info.name, "factory");
        assert!(info.balances.is_some());
        assert!(info.storage.is_some());
        assert!(info.needs.is_none());
        assert!(info.open_bidding.is_none());
    }
}
