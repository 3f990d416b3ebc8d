//! Role tables consulted by the external permission layer.
//!
//! For each component kind these tables list which call-surface actions a
//! role may invoke and which notifications it may subscribe to. The engine
//! does not enforce them; they are part of the published contract.

use crate::enums::{ComponentKind, Role};
use crate::notification::NotificationKind;

const ACCOUNT_READ: &[&str] = &["getBalance", "isBankrupt", "getJournal", "getLedger"];
const ACCOUNT_ALL: &[&str] = &["add", "getBalance", "isBankrupt", "getJournal", "getLedger"];

const INVENTORY_READ: &[&str] = &["getStorageUnit", "getStorage", "costOfSales", "getJournal"];
const INVENTORY_ALL: &[&str] = &[
    "import",
    "export",
    "regist",
    "getStorageUnit",
    "getStorage",
    "costOfSales",
    "getJournal",
];

const IO_READ: &[&str] = &["getJournal"];
const IO_OWNER: &[&str] = &["export", "getJournal"];
const IO_ALL: &[&str] = &["import", "export", "getJournal"];

const BIDDING_MARKET_READ: &[&str] = &["getItems", "getNews"];
const BIDDING_MARKET_ALL: &[&str] = &[
    "release", "sign", "cancel", "breakoff", "deliver", "getItems", "getNews",
];

const BIDDING_RECEIVER_READ: &[&str] = &["getItems"];
const BIDDING_RECEIVER_ALL: &[&str] = &[
    "release", "sign", "cancel", "breakoff", "deliver", "getItems",
];

const MARKET_READ: &[&str] = &["getNeeds", "getNews"];
const MARKET_OWNER: &[&str] = &["buy", "getNeeds", "getNews"];
const MARKET_ALL: &[&str] = &["buy", "setNeeds", "getNeeds", "getNews"];

const MARKET_RECEIVER_READ: &[&str] = &[];
const MARKET_RECEIVER_ALL: &[&str] = &["sell"];

const ASSEMBLY_READ: &[&str] = &["getJournal", "getBillOfMaterials"];
const ASSEMBLY_ALL: &[&str] = &["assemble", "getJournal", "getBillOfMaterials"];

/// Call-surface actions `role` may invoke on a component of `kind`.
pub const fn allowed_actions(kind: ComponentKind, role: Role) -> &'static [&'static str] {
    match (kind, role) {
        (ComponentKind::Account, Role::Admin | Role::Owner) => ACCOUNT_ALL,
        (ComponentKind::Account, Role::Guest) => ACCOUNT_READ,
        (ComponentKind::Inventory, Role::Admin) => INVENTORY_ALL,
        (ComponentKind::Inventory, Role::Owner | Role::Guest) => INVENTORY_READ,
        (ComponentKind::Io, Role::Admin) => IO_ALL,
        (ComponentKind::Io, Role::Owner) => IO_OWNER,
        (ComponentKind::Io, Role::Guest) => IO_READ,
        (ComponentKind::BiddingMarket, Role::Admin) => BIDDING_MARKET_ALL,
        (ComponentKind::BiddingMarket, Role::Owner | Role::Guest) => BIDDING_MARKET_READ,
        (ComponentKind::BiddingReceiver, Role::Admin | Role::Owner) => BIDDING_RECEIVER_ALL,
        (ComponentKind::BiddingReceiver, Role::Guest) => BIDDING_RECEIVER_READ,
        (ComponentKind::Market, Role::Admin) => MARKET_ALL,
        (ComponentKind::Market, Role::Owner) => MARKET_OWNER,
        (ComponentKind::Market, Role::Guest) => MARKET_READ,
        (ComponentKind::MarketReceiver, Role::Admin | Role::Owner) => MARKET_RECEIVER_ALL,
        (ComponentKind::MarketReceiver, Role::Guest) => MARKET_RECEIVER_READ,
        (ComponentKind::Assembly, Role::Admin | Role::Owner) => ASSEMBLY_ALL,
        (ComponentKind::Assembly, Role::Guest) => ASSEMBLY_READ,
    }
}

const NOTIFY_NONE: &[NotificationKind] = &[];
const NOTIFY_INVENTORY: &[NotificationKind] = &[
    NotificationKind::InventoryImport,
    NotificationKind::InventoryExport,
    NotificationKind::InventoryRegist,
    NotificationKind::InventoryStorageCost,
];
const NOTIFY_IO: &[NotificationKind] = &[
    NotificationKind::Import,
    NotificationKind::Export,
    NotificationKind::Complete,
];
const NOTIFY_BIDDING: &[NotificationKind] = &[
    NotificationKind::BiddingReleased,
    NotificationKind::BiddingSigned,
    NotificationKind::BiddingCanceled,
    NotificationKind::BiddingBreakoff,
    NotificationKind::BiddingCompleted,
    NotificationKind::BiddingNewsPublished,
];
const NOTIFY_BIDDING_PUBLIC: &[NotificationKind] = &[
    NotificationKind::BiddingReleased,
    NotificationKind::BiddingNewsPublished,
];
const NOTIFY_MARKET: &[NotificationKind] = &[
    NotificationKind::NeedsChange,
    NotificationKind::NewsPublished,
];
const NOTIFY_ASSEMBLY: &[NotificationKind] = &[NotificationKind::Assembled];

/// Notifications `role` may subscribe to on a component of `kind`.
pub const fn subscribable_notifications(
    kind: ComponentKind,
    role: Role,
) -> &'static [NotificationKind] {
    match (kind, role) {
        (ComponentKind::Account, _) | (ComponentKind::MarketReceiver, Role::Guest) => NOTIFY_NONE,
        (ComponentKind::Inventory, Role::Admin | Role::Owner) => NOTIFY_INVENTORY,
        (ComponentKind::Inventory, Role::Guest) => NOTIFY_NONE,
        (ComponentKind::Io, Role::Admin | Role::Owner) => NOTIFY_IO,
        (ComponentKind::Io, Role::Guest) => NOTIFY_NONE,
        (
            ComponentKind::BiddingMarket | ComponentKind::BiddingReceiver,
            Role::Admin | Role::Owner,
        ) => NOTIFY_BIDDING,
        (ComponentKind::BiddingMarket | ComponentKind::BiddingReceiver, Role::Guest) => {
            NOTIFY_BIDDING_PUBLIC
        }
        (ComponentKind::Market | ComponentKind::MarketReceiver, Role::Admin | Role::Owner)
        | (ComponentKind::Market, Role::Guest) => NOTIFY_MARKET,
        (ComponentKind::Assembly, Role::Admin | Role::Owner) => NOTIFY_ASSEMBLY,
        (ComponentKind::Assembly, Role::Guest) => NOTIFY_NONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_do_everything_owner_can() {
        for kind in ComponentKind::ALL {
            let admin = allowed_actions(kind, Role::Admin);
            for action in allowed_actions(kind, Role::Owner) {
                assert!(admin.contains(action), "{kind}: admin lacks {action}");
            }
        }
    }

    #[test]
    fn guests_never_mutate_ledgers() {
        assert!(!allowed_actions(ComponentKind::Account, Role::Guest).contains(&"add"));
        assert!(!allowed_actions(ComponentKind::Inventory, Role::Owner).contains(&"regist"));
    }

    #[test]
    fn guests_see_public_bidding_news() {
        let kinds = subscribable_notifications(ComponentKind::BiddingMarket, Role::Guest);
        assert!(kinds.contains(&NotificationKind::BiddingReleased));
        assert!(!kinds.contains(&NotificationKind::BiddingSigned));
    }
}
