//! String-addressed call surface: `(node, component, action, args)`.
//!
//! Action names and argument shapes follow the role tables in
//! [`supplysim_types::permissions`]. Arguments arrive as JSON and are
//! decoded into typed requests before anything runs; results go back as
//! JSON. Authorization happens before this layer.

use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use supplysim_types::{
    BiddingItemId, Classification, ComponentKind, GoodsLine, GoodsQuantity, Transaction,
};

use crate::engine::Engine;
use crate::error::EngineError;

/// Pseudo-component for whole-node queries.
pub const NODE_COMPONENT: &str = "node";

mod args {
    use super::{BiddingItemId, Classification, Decimal, GoodsLine, GoodsQuantity};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Balance {
        pub classification: Classification,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Ledger {
        #[serde(default)]
        pub classification: Option<Classification>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Stock {
        pub goods: Vec<GoodsLine>,
        pub price: Decimal,
        #[serde(default)]
        pub counter_object: Option<String>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Regist {
        pub goods: Vec<GoodsLine>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Good {
        pub good: String,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Quantities {
        pub goods: Vec<GoodsQuantity>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Import {
        pub from: String,
        pub goods: Vec<GoodsLine>,
        pub price: Decimal,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Export {
        pub to: String,
        pub goods: Vec<GoodsLine>,
        pub price: Decimal,
    }

    /// Hosted-market form: the acting node is named in the arguments.
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Release {
        pub publisher: String,
        pub goods: Vec<GoodsLine>,
        pub price: Decimal,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ItemAction {
        pub id: BiddingItemId,
        #[serde(alias = "signer")]
        pub caller: String,
    }

    /// Receiver form: the acting node is the called node.
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReceiverRelease {
        pub market: String,
        pub goods: Vec<GoodsLine>,
        pub price: Decimal,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReceiverItem {
        pub market: String,
        pub id: BiddingItemId,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MarketName {
        pub market: String,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Buy {
        pub seller: String,
        pub goods: Vec<GoodsQuantity>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Sell {
        pub market: String,
        pub goods: Vec<GoodsQuantity>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Needs {
        pub needs: Vec<GoodsLine>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Assemble {
        pub receiver: String,
        pub product: String,
        pub unit: u64,
    }
}

fn decode<T: DeserializeOwned>(action: &str, args: Value) -> Result<T, EngineError> {
    serde_json::from_value(args).map_err(|e| EngineError::InvalidArguments {
        action: action.to_owned(),
        reason: e.to_string(),
    })
}

fn reply<T: Serialize>(action: &str, value: T) -> Result<Value, EngineError> {
    serde_json::to_value(value).map_err(|e| EngineError::InvalidArguments {
        action: action.to_owned(),
        reason: format!("result not representable: {e}"),
    })
}

fn not_found(component: &str, action: &str) -> EngineError {
    EngineError::ActionNotFound {
        component: component.to_owned(),
        action: action.to_owned(),
    }
}

impl Engine {
    /// Invoke `action` on `component` of `node` with JSON `args`.
    ///
    /// `component` is a component kind (`"account"`, `"bidding_market"`,
    /// ...) or `"node"` for `getInfo`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NodeNotFound`],
    /// [`EngineError::UnknownComponent`], [`EngineError::ActionNotFound`],
    /// [`EngineError::InvalidArguments`], or whatever the action returns.
    pub async fn call(
        &mut self,
        node: &str,
        component: &str,
        action: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        self.node(node)?;
        if component == NODE_COMPONENT {
            return match action {
                "getInfo" => reply(action, self.node(node)?.info()),
                _ => Err(not_found(component, action)),
            };
        }
        let kind: ComponentKind = component
            .parse()
            .map_err(|_| EngineError::UnknownComponent {
                name: component.to_owned(),
            })?;

        match kind {
            ComponentKind::Account => self.call_account(node, action, args).await,
            ComponentKind::Inventory => self.call_inventory(node, action, args).await,
            ComponentKind::Io => self.call_io(node, action, args).await,
            ComponentKind::BiddingMarket => self.call_bidding_market(node, action, args).await,
            ComponentKind::BiddingReceiver => {
                self.call_bidding_receiver(node, action, args).await
            }
            ComponentKind::Market => self.call_market(node, action, args).await,
            ComponentKind::MarketReceiver => self.call_market_receiver(node, action, args).await,
            ComponentKind::Assembly => self.call_assembly(node, action, args).await,
        }
    }

    async fn call_account(
        &mut self,
        node: &str,
        action: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        match action {
            "add" => {
                let tx: Transaction = decode(action, args)?;
                let game_time = self.game_time();
                let entry = self.node_mut(node)?.account_mut()?.add(tx, game_time).await?;
                reply(action, entry)
            }
            "getBalance" => {
                let a: args::Balance = decode(action, args)?;
                reply(action, self.node(node)?.account()?.balance(a.classification))
            }
            "isBankrupt" => reply(action, self.node(node)?.account()?.is_bankrupt()),
            "getJournal" => reply(action, self.node(node)?.account()?.journal()),
            "getLedger" => {
                let a: Option<args::Ledger> = decode(action, args)?;
                let account = self.node(node)?.account()?;
                match a.and_then(|a| a.classification) {
                    Some(classification) => reply(action, account.items(classification)),
                    None => reply(action, account.balances()),
                }
            }
            _ => Err(not_found(ComponentKind::Account.as_str(), action)),
        }
    }

    async fn call_inventory(
        &mut self,
        node: &str,
        action: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        let game_time = self.game_time();
        match action {
            "import" => {
                let a: args::Stock = decode(action, args)?;
                self.node_mut(node)?
                    .stock_import(&a.goods, a.price, a.counter_object.as_deref(), game_time)
                    .await?;
                Ok(Value::Null)
            }
            "export" => {
                let a: args::Stock = decode(action, args)?;
                let cost = self
                    .node_mut(node)?
                    .stock_export(&a.goods, a.price, a.counter_object.as_deref(), game_time)
                    .await?;
                reply(action, cost)
            }
            "regist" => {
                let a: args::Regist = decode(action, args)?;
                self.node_mut(node)?
                    .inventory_mut()?
                    .regist(&a.goods, game_time)
                    .await?;
                Ok(Value::Null)
            }
            "getStorageUnit" => {
                let a: args::Good = decode(action, args)?;
                reply(action, self.node(node)?.inventory()?.storage_unit(&a.good))
            }
            "getStorage" => reply(action, self.node(node)?.inventory()?.storage()),
            "costOfSales" => {
                let a: args::Quantities = decode(action, args)?;
                reply(action, self.node(node)?.inventory()?.cost_of_sales(&a.goods)?)
            }
            "getJournal" => reply(action, self.node(node)?.inventory()?.journal()),
            _ => Err(not_found(ComponentKind::Inventory.as_str(), action)),
        }
    }

    async fn call_io(&mut self, node: &str, action: &str, args: Value) -> Result<Value, EngineError> {
        match action {
            "import" => {
                let a: args::Import = decode(action, args)?;
                let item = self.accept_import(node, &a.from, &a.goods, a.price).await?;
                reply(action, item)
            }
            "export" => {
                let a: args::Export = decode(action, args)?;
                let shipment = self.transfer(node, &a.to, &a.goods, a.price).await?;
                reply(action, shipment)
            }
            "getJournal" => reply(action, self.node(node)?.io()?.journal()),
            _ => Err(not_found(ComponentKind::Io.as_str(), action)),
        }
    }

    async fn call_bidding_market(
        &mut self,
        node: &str,
        action: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        match action {
            "release" => {
                let a: args::Release = decode(action, args)?;
                let item = self
                    .bidding_release(node, &a.publisher, a.goods, a.price)
                    .await?;
                reply(action, item)
            }
            "sign" => {
                let a: args::ItemAction = decode(action, args)?;
                reply(action, self.bidding_sign(node, a.id, &a.caller).await?)
            }
            "cancel" => {
                let a: args::ItemAction = decode(action, args)?;
                reply(action, self.bidding_cancel(node, a.id, &a.caller).await?)
            }
            "breakoff" => {
                let a: args::ItemAction = decode(action, args)?;
                reply(action, self.bidding_breakoff(node, a.id, &a.caller).await?)
            }
            "deliver" => {
                let a: args::ItemAction = decode(action, args)?;
                reply(action, self.bidding_deliver(node, a.id, &a.caller).await?)
            }
            "getItems" => reply(action, self.node(node)?.bidding_market()?.items()),
            "getNews" => reply(action, self.node(node)?.bidding_market()?.news()),
            _ => Err(not_found(ComponentKind::BiddingMarket.as_str(), action)),
        }
    }

    async fn call_bidding_receiver(
        &mut self,
        node: &str,
        action: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        match action {
            "release" => {
                let a: args::ReceiverRelease = decode(action, args)?;
                let item = self.bidding_release(&a.market, node, a.goods, a.price).await?;
                reply(action, item)
            }
            "sign" => {
                let a: args::ReceiverItem = decode(action, args)?;
                reply(action, self.bidding_sign(&a.market, a.id, node).await?)
            }
            "cancel" => {
                let a: args::ReceiverItem = decode(action, args)?;
                reply(action, self.bidding_cancel(&a.market, a.id, node).await?)
            }
            "breakoff" => {
                let a: args::ReceiverItem = decode(action, args)?;
                reply(action, self.bidding_breakoff(&a.market, a.id, node).await?)
            }
            "deliver" => {
                let a: args::ReceiverItem = decode(action, args)?;
                reply(action, self.bidding_deliver(&a.market, a.id, node).await?)
            }
            "getItems" => {
                let a: args::MarketName = decode(action, args)?;
                self.node(node)?.check_bidding_access(&a.market, false)?;
                reply(action, self.node(&a.market)?.bidding_market()?.items())
            }
            _ => Err(not_found(ComponentKind::BiddingReceiver.as_str(), action)),
        }
    }

    async fn call_market(
        &mut self,
        node: &str,
        action: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        match action {
            "buy" => {
                let a: args::Buy = decode(action, args)?;
                reply(action, self.market_sell(node, &a.seller, &a.goods).await?)
            }
            "setNeeds" => {
                let a: args::Needs = decode(action, args)?;
                self.set_needs(node, a.needs).await?;
                Ok(Value::Null)
            }
            "getNeeds" => reply(action, self.node(node)?.market()?.needs()),
            "getNews" => reply(action, self.node(node)?.market()?.news()),
            _ => Err(not_found(ComponentKind::Market.as_str(), action)),
        }
    }

    async fn call_market_receiver(
        &mut self,
        node: &str,
        action: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        match action {
            "sell" => {
                let a: args::Sell = decode(action, args)?;
                reply(action, self.market_sell(&a.market, node, &a.goods).await?)
            }
            _ => Err(not_found(ComponentKind::MarketReceiver.as_str(), action)),
        }
    }

    async fn call_assembly(
        &mut self,
        node: &str,
        action: &str,
        args: Value,
    ) -> Result<Value, EngineError> {
        match action {
            "assemble" => {
                let a: args::Assemble = decode(action, args)?;
                let record = self.assemble(node, &a.receiver, &a.product, a.unit).await?;
                reply(action, record)
            }
            "getJournal" => reply(action, self.node(node)?.assembly()?.journal()),
            "getBillOfMaterials" => {
                reply(action, self.node(node)?.assembly()?.bill_of_materials())
            }
            _ => Err(not_found(ComponentKind::Assembly.as_str(), action)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use supplysim_core::config::GameConfig;
    use supplysim_store::DocumentStore;
    use supplysim_types::{EngineId, Role, allowed_actions};

    use super::*;

    const YAML: &str = r"
nodes:
  - name: hub
    components:
      account: {}
      inventory: {}
      io: {}
      bidding_market:
        upstreams: [hub]
      bidding_receiver:
        markets: [hub]
      market:
        upstreams: [hub]
      market_receiver:
        markets: [hub]
      assembly:
        receivers: [hub]
";

    async fn engine() -> Engine {
        let config = GameConfig::parse(YAML).unwrap();
        Engine::load(EngineId::new(), &config, DocumentStore::memory())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn every_listed_action_is_dispatched() {
        let mut e = engine().await;
        for kind in ComponentKind::ALL {
            for action in allowed_actions(kind, Role::Admin) {
                let result = e.call("hub", kind.as_str(), action, Value::Null).await;
                assert!(
                    !matches!(result, Err(EngineError::ActionNotFound { .. })),
                    "{kind}.{action} is not dispatched"
                );
            }
        }
    }

    #[tokio::test]
    async fn unknown_names_are_not_found() {
        let mut e = engine().await;
        assert!(matches!(
            e.call("nowhere", "account", "getBalance", Value::Null).await,
            Err(EngineError::NodeNotFound { .. })
        ));
        assert!(matches!(
            e.call("hub", "warehouse", "getBalance", Value::Null).await,
            Err(EngineError::UnknownComponent { .. })
        ));
        assert!(matches!(
            e.call("hub", "account", "close", Value::Null).await,
            Err(EngineError::ActionNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_arguments_change_nothing() {
        let mut e = engine().await;
        let result = e
            .call("hub", "inventory", "import", json!({ "goods": "Wheel" }))
            .await;
        assert!(matches!(result, Err(EngineError::InvalidArguments { .. })));
        let journal = e.call("hub", "inventory", "getJournal", Value::Null).await.unwrap();
        assert_eq!(journal, json!([]));
    }

    #[tokio::test]
    async fn account_round_trip_through_json() {
        let mut e = engine().await;
        e.call(
            "hub",
            "account",
            "add",
            json!({
                "debit": [{ "amount": "100", "classification": "Cash" }],
                "credit": [{ "amount": "100", "classification": "Sales" }],
            }),
        )
        .await
        .unwrap();
        let cash = e
            .call("hub", "account", "getBalance", json!({ "classification": "Cash" }))
            .await
            .unwrap();
        assert_eq!(cash, json!("100"));
        let info = e.call("hub", "node", "getInfo", Value::Null).await.unwrap();
        assert_eq!(info["name"], json!("hub"));
    }
}
