//! End-to-end game flows across several nodes.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::too_many_lines
)]

use rust_decimal_macros::dec;
use serde_json::json;
use tokio::sync::broadcast::error::TryRecvError;

use supplysim_core::config::GameConfig;
use supplysim_engine::{Engine, EngineError, ScheduledTask};
use supplysim_nodes::NodeError;
use supplysim_store::DocumentStore;
use supplysim_types::{
    BiddingStage, Classification, ComponentKind, EngineId, GameTime, GoodsLine, GoodsQuantity,
    NotificationKind, Stage, TickInstant, TransportationStatus,
};

const GAME: &str = r#"
game:
  name: bikes
  game_days: 3
  day_length: 10
nodes:
  - name: supplier
    components:
      account: {}
      inventory: {}
      io: {}
      bidding_receiver:
        markets: [exchange]
  - name: factory
    components:
      account: {}
      inventory: {}
      io:
        transportation_status: DELIVERING
        transportation_time: 3
      bidding_receiver:
        markets: [exchange]
      market_receiver:
        markets: [mall]
      assembly:
        receivers: [factory]
        bill_of_materials:
          Bike:
            - { name: Body, unit: 1 }
            - { name: Wheel, unit: 2 }
  - name: exchange
    components:
      bidding_market:
        upstreams: [supplier]
        downstreams: [factory]
        penalty_ratio: "0.1"
        compensation_ratio: "0.05"
        news:
          - { title: Steel shortage, content: Body prices rise, day: 1, time: 2 }
  - name: mall
    components:
      market:
        upstreams: [factory]
        needs:
          - { name: Bike, unit: 5, unitPrice: "300" }
        news:
          - title: Cycling boom
            content: Demand doubles
            day: 2
            time: 0
            needs:
              - { name: Bike, unit: 10, unitPrice: "320" }
"#;

const QUOTA_GAME: &str = r#"
game:
  game_days: 2
  day_length: 10
nodes:
  - name: supplier
    components:
      account: {}
      inventory: {}
      io: {}
      bidding_receiver:
        markets: [exchange]
      market_receiver:
        markets: [mall]
  - name: factory
    components:
      account: {}
      inventory: {}
      io:
        available_goods: { Body: 5 }
      bidding_receiver:
        markets: [exchange]
  - name: exchange
    components:
      bidding_market:
        upstreams: [supplier]
        downstreams: [factory]
  - name: mall
    components:
      account: {}
      inventory: {}
      io:
        available_goods: { Body: 1 }
      market:
        upstreams: [supplier]
        needs:
          - { name: Body, unit: 5, unitPrice: "30" }
"#;

async fn started() -> Engine {
    started_with(GAME).await
}

async fn started_with(yaml: &str) -> Engine {
    let config = GameConfig::parse(yaml).unwrap();
    let mut engine = Engine::load(EngineId::new(), &config, DocumentStore::memory())
        .await
        .unwrap();
    while engine.stage() != Stage::Start {
        engine.next_stage().await.unwrap();
    }
    engine
}

async fn stock(engine: &mut Engine, node: &str, goods: &[GoodsLine]) {
    let game_time = engine.game_time();
    engine
        .node_mut(node)
        .unwrap()
        .inventory_mut()
        .unwrap()
        .regist(goods, game_time)
        .await
        .unwrap();
}

fn units(engine: &Engine, node: &str, good: &str) -> u64 {
    engine
        .node(node)
        .unwrap()
        .inventory()
        .unwrap()
        .storage_unit(good)
}

fn balance(engine: &Engine, node: &str, classification: Classification) -> rust_decimal::Decimal {
    engine
        .node(node)
        .unwrap()
        .account()
        .unwrap()
        .balance(classification)
}

#[tokio::test]
async fn delivering_shipment_lands_after_transit() {
    let mut e = started().await;
    stock(&mut e, "supplier", &[GoodsLine::new("Body", 10, dec!(10))]).await;
    let mut io_events = e.subscribe("factory", ComponentKind::Io).unwrap();

    let shipment = e
        .transfer("supplier", "factory", &[GoodsLine::new("Body", 10, dec!(15))], dec!(150))
        .await
        .unwrap();
    assert_eq!(
        shipment.import.transportation_status,
        TransportationStatus::Delivering
    );
    assert_eq!(units(&e, "supplier", "Body"), 0);
    assert_eq!(units(&e, "factory", "Body"), 0);

    e.tick().await.unwrap();
    e.tick().await.unwrap();
    assert_eq!(units(&e, "factory", "Body"), 0);

    e.tick().await.unwrap();
    assert_eq!(e.game_time(), GameTime::working(1, 3));
    assert_eq!(units(&e, "factory", "Body"), 10);
    assert_eq!(balance(&e, "factory", Classification::Inventory), dec!(150));

    e.tick().await.unwrap();
    e.tick().await.unwrap();
    assert_eq!(units(&e, "factory", "Body"), 10);

    let mut completions = 0;
    loop {
        match io_events.try_recv() {
            Ok(n) if n.kind == NotificationKind::Complete => completions += 1,
            Ok(_) => {}
            Err(TryRecvError::Empty) => break,
            Err(other) => panic!("unexpected receive error: {other}"),
        }
    }
    assert_eq!(completions, 1);
    assert_eq!(e.pending_tasks().count(), 1);
}

#[tokio::test]
async fn transit_past_day_end_carries_into_next_day() {
    let mut e = started().await;
    stock(&mut e, "supplier", &[GoodsLine::new("Wheel", 4, dec!(5))]).await;
    for _ in 0..8 {
        e.tick().await.unwrap();
    }
    e.transfer("supplier", "factory", &[GoodsLine::new("Wheel", 4, dec!(5))], dec!(20))
        .await
        .unwrap();

    // day 1 time 8 plus 3 ticks is day 2 time 1
    e.tick().await.unwrap();
    e.tick().await.unwrap();
    assert!(!e.game_time().is_working);
    e.next_day().await.unwrap();
    assert_eq!(units(&e, "factory", "Wheel"), 0);
    e.tick().await.unwrap();
    assert_eq!(units(&e, "factory", "Wheel"), 4);
}

#[tokio::test]
async fn shipment_before_start_departs_on_day_one() {
    let config = GameConfig::parse(GAME).unwrap();
    let mut e = Engine::load(EngineId::new(), &config, DocumentStore::memory())
        .await
        .unwrap();
    while e.stage() != Stage::Ready {
        e.next_stage().await.unwrap();
    }
    stock(&mut e, "supplier", &[GoodsLine::new("Body", 2, dec!(10))]).await;
    e.transfer("supplier", "factory", &[GoodsLine::new("Body", 2, dec!(10))], dec!(20))
        .await
        .unwrap();

    let arrivals: Vec<TickInstant> = e
        .pending_tasks()
        .filter(|(_, task)| matches!(task, ScheduledTask::CompleteShipment { .. }))
        .map(|(at, _)| at)
        .collect();
    assert_eq!(arrivals, vec![TickInstant { day: 1, time: 3 }]);

    e.next_stage().await.unwrap();
    assert_eq!(units(&e, "factory", "Body"), 0);
    e.tick().await.unwrap();
    e.tick().await.unwrap();
    assert_eq!(units(&e, "factory", "Body"), 0);
    e.tick().await.unwrap();
    assert_eq!(units(&e, "factory", "Body"), 2);
}

#[tokio::test]
async fn bidding_contract_is_delivered_once() {
    let mut e = started().await;
    stock(&mut e, "supplier", &[GoodsLine::new("Body", 5, dec!(10))]).await;
    let mut relayed = e
        .subscribe("supplier", ComponentKind::BiddingReceiver)
        .unwrap();

    let item = e
        .bidding_release(
            "exchange",
            "factory",
            vec![GoodsLine::new("Body", 5, dec!(20))],
            dec!(100),
        )
        .await
        .unwrap();
    assert_eq!(item.stage, BiddingStage::Bidding);
    assert_eq!(
        relayed.recv().await.unwrap().kind,
        NotificationKind::BiddingReleased
    );

    // same chain side cannot sign
    assert!(e.bidding_sign("exchange", item.id, "factory").await.is_err());
    let signed = e.bidding_sign("exchange", item.id, "supplier").await.unwrap();
    assert_eq!(signed.stage, BiddingStage::Signed);

    let done = e.bidding_deliver("exchange", item.id, "factory").await.unwrap();
    assert_eq!(done.stage, BiddingStage::Completed);
    assert_eq!(units(&e, "supplier", "Body"), 0);
    assert_eq!(balance(&e, "supplier", Classification::Sales), dec!(-100));
    assert_eq!(balance(&e, "supplier", Classification::CostOfSales), dec!(50));

    let again = e.bidding_deliver("exchange", item.id, "factory").await;
    assert!(matches!(
        again,
        Err(EngineError::Node {
            source: NodeError::IllegalBiddingStage { .. }
        })
    ));
    assert_eq!(
        e.node("supplier").unwrap().io().unwrap().journal().len(),
        1
    );
}

#[tokio::test]
async fn breakoff_posts_penalty_and_compensation() {
    let mut e = started().await;
    let item = e
        .bidding_release(
            "exchange",
            "supplier",
            vec![GoodsLine::new("Wheel", 10, dec!(10))],
            dec!(100),
        )
        .await
        .unwrap();
    assert!(e.bidding_cancel("exchange", item.id, "factory").await.is_err());
    e.bidding_sign("exchange", item.id, "factory").await.unwrap();
    assert!(e.bidding_cancel("exchange", item.id, "supplier").await.is_err());

    let broken = e.bidding_breakoff("exchange", item.id, "factory").await.unwrap();
    assert_eq!(broken.stage, BiddingStage::Breakoff);

    assert_eq!(
        balance(&e, "factory", Classification::CounterPartyDefault),
        dec!(10)
    );
    assert_eq!(
        balance(&e, "factory", Classification::AccountsPayable),
        dec!(-10)
    );
    assert_eq!(balance(&e, "supplier", Classification::Cash), dec!(5));
    assert_eq!(
        balance(&e, "supplier", Classification::IncomeFromCounterPartyDefault),
        dec!(-5)
    );
    let journals = ["factory", "supplier"]
        .map(|n| e.node(n).unwrap().account().unwrap().journal().len());
    assert_eq!(journals, [1, 1]);
}

#[tokio::test]
async fn bankrupt_node_cannot_publish() {
    let mut e = started().await;
    e.call(
        "factory",
        "account",
        "add",
        json!({
            "debit": [{ "amount": "50", "classification": "Cash" }],
            "unbalance": true,
        }),
    )
    .await
    .unwrap();
    assert!(e.node("factory").unwrap().is_bankrupt());

    let result = e
        .bidding_release(
            "exchange",
            "factory",
            vec![GoodsLine::new("Body", 1, dec!(10))],
            dec!(10),
        )
        .await;
    assert!(matches!(
        result,
        Err(EngineError::Node {
            source: NodeError::Bankrupt { .. }
        })
    ));
}

#[tokio::test]
async fn assembled_product_sells_into_the_market() {
    let mut e = started().await;
    stock(
        &mut e,
        "factory",
        &[
            GoodsLine::new("Body", 1, dec!(10)),
            GoodsLine::new("Wheel", 2, dec!(10)),
        ],
    )
    .await;

    let record = e.assemble("factory", "factory", "Bike", 1).await.unwrap();
    assert_eq!(record.cost, dec!(30));
    assert_eq!(units(&e, "factory", "Bike"), 1);
    assert_eq!(units(&e, "factory", "Wheel"), 0);

    let sale = e
        .market_sell(
            "mall",
            "factory",
            &[GoodsQuantity {
                name: "Bike".to_owned(),
                unit: 1,
            }],
        )
        .await
        .unwrap();
    assert_eq!(sale.price, dec!(300));
    assert!(sale.import.is_none());
    assert_eq!(units(&e, "factory", "Bike"), 0);
    assert_eq!(e.node("mall").unwrap().market().unwrap().needs()[0].unit, 4);

    let too_many = e
        .market_sell(
            "mall",
            "factory",
            &[GoodsQuantity {
                name: "Bike".to_owned(),
                unit: 5,
            }],
        )
        .await;
    assert!(matches!(
        too_many,
        Err(EngineError::Node {
            source: NodeError::InsufficientNeeds { .. }
        })
    ));
}

#[tokio::test]
async fn news_is_released_on_schedule() {
    let mut e = started().await;
    e.tick().await.unwrap();
    assert!(e.node("exchange").unwrap().bidding_market().unwrap().news().is_empty());
    e.tick().await.unwrap();
    assert_eq!(
        e.node("exchange").unwrap().bidding_market().unwrap().news().len(),
        1
    );

    for _ in 0..8 {
        e.tick().await.unwrap();
    }
    e.next_day().await.unwrap();
    let needs = e.node("mall").unwrap().market().unwrap().needs().to_vec();
    assert_eq!(needs, vec![GoodsLine::new("Bike", 10, dec!(320))]);
}

#[tokio::test]
async fn delivery_over_importer_quota_changes_nothing() {
    let mut e = started_with(QUOTA_GAME).await;
    stock(&mut e, "supplier", &[GoodsLine::new("Body", 20, dec!(10))]).await;
    let item = e
        .bidding_release(
            "exchange",
            "factory",
            vec![GoodsLine::new("Body", 10, dec!(20))],
            dec!(200),
        )
        .await
        .unwrap();
    e.bidding_sign("exchange", item.id, "supplier").await.unwrap();

    for _ in 0..2 {
        let result = e.bidding_deliver("exchange", item.id, "supplier").await;
        assert!(matches!(
            result,
            Err(EngineError::Node {
                source: NodeError::GoodsNotAvailable {
                    remaining: 5,
                    requested: 10,
                    ..
                }
            })
        ));
    }

    assert_eq!(units(&e, "supplier", "Body"), 20);
    assert_eq!(units(&e, "factory", "Body"), 0);
    assert!(e.node("supplier").unwrap().io().unwrap().journal().is_empty());
    assert!(e.node("factory").unwrap().io().unwrap().journal().is_empty());
    assert!(e.node("supplier").unwrap().account().unwrap().journal().is_empty());
    let stage = e
        .node("exchange")
        .unwrap()
        .bidding_market()
        .unwrap()
        .item(item.id)
        .unwrap()
        .stage;
    assert_eq!(stage, BiddingStage::Signed);
}

#[tokio::test]
async fn spot_sale_over_market_quota_changes_nothing() {
    let mut e = started_with(QUOTA_GAME).await;
    stock(&mut e, "supplier", &[GoodsLine::new("Body", 4, dec!(10))]).await;

    let result = e
        .market_sell(
            "mall",
            "supplier",
            &[GoodsQuantity {
                name: "Body".to_owned(),
                unit: 2,
            }],
        )
        .await;
    assert!(matches!(
        result,
        Err(EngineError::Node {
            source: NodeError::GoodsNotAvailable { .. }
        })
    ));
    assert_eq!(units(&e, "supplier", "Body"), 4);
    assert!(e.node("supplier").unwrap().io().unwrap().journal().is_empty());
    assert_eq!(e.node("mall").unwrap().market().unwrap().needs()[0].unit, 5);

    let sale = e
        .market_sell(
            "mall",
            "supplier",
            &[GoodsQuantity {
                name: "Body".to_owned(),
                unit: 1,
            }],
        )
        .await
        .unwrap();
    assert_eq!(sale.price, dec!(30));
    assert_eq!(units(&e, "mall", "Body"), 1);
}
