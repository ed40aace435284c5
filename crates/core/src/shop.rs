//! Avatar shop: starter avatars, the priced catalogue and ownership rules.

use thiserror::Error;
use tracing::info;

use crate::models::Player;

/// Avatars every player owns from the start.
pub const STARTER_AVATARS: &[&str] = &["🦊", "🐶", "🤖", "🚀", "🦄", "🦁"];

/// A purchasable avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvatarItem {
    /// Identifier stored on the player. Several items may share one.
    pub id: &'static str,
    /// Name shown in the shop.
    pub name: &'static str,
    /// Price in coins.
    pub cost: u32,
}

const fn item(id: &'static str, name: &'static str, cost: u32) -> AvatarItem {
    AvatarItem { id, name, cost }
}

/// Items offered in the shop, in display order.
pub const CATALOGUE: &[AvatarItem] = &[
    item("🦸‍♂️", "Iron Man", 50),
    item("🦸‍♀️", "Black Widow", 60),
    item("🦸‍♀️", "Captain Marvel", 70),
    item("🕷️", "Spider-Man", 80),
    item("⚡", "Thor", 100),
    item("🛡️", "Captain America", 120),
    item("🟢", "Hulk", 150),
    item("🔥", "Human Torch", 200),
    item("🐉", "Goku", 100),
    item("🦁", "Vegeta", 120),
    item("👩‍🦰", "Bulma", 80),
    item("🧙‍♂️", "Piccolo", 90),
    item("🔥", "Gohan", 110),
    item("♈", "Pegasus (Seiya)", 80),
    item("♏", "Andromeda (Shun)", 85),
    item("♉", "Dragon (Shiryu)", 90),
    item("♊", "Cygnus (Hyoga)", 95),
    item("♋", "Phoenix (Ikki)", 100),
    item("🧚‍♀️", "Warrior Fairy", 50),
    item("👸", "Warrior Princess", 70),
    item("🦹‍♀️", "Epic Villain", 90),
    item("🧝‍♀️", "Elf Archer", 60),
    item("🧙‍♀️", "Sorceress", 75),
];

/// Shop failures shown to the player.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShopError {
    /// The item's avatar is already owned.
    #[error("you already own {0}")]
    AlreadyOwned(String),
    /// The player cannot afford the item.
    #[error("you need {missing} more coins for {name}")]
    InsufficientCoins {
        /// Item name.
        name: String,
        /// Coins still needed.
        missing: u32,
    },
    /// Wearing an avatar that was never bought.
    #[error("buy this avatar first")]
    NotOwned,
}

/// Whether the player may wear `id`.
pub fn is_owned(player: &Player, id: &str) -> bool {
    STARTER_AVATARS.contains(&id) || player.unlocked_avatars.contains(id)
}

/// Starter avatars followed by purchased ones, without duplicates.
pub fn owned_avatars(player: &Player) -> Vec<String> {
    let mut owned: Vec<String> = STARTER_AVATARS.iter().map(|id| id.to_string()).collect();
    for id in &player.unlocked_avatars {
        if !owned.contains(id) {
            owned.push(id.clone());
        }
    }
    owned
}

/// Buy `item`, deducting its cost.
pub fn purchase(player: &mut Player, item: &AvatarItem) -> Result<(), ShopError> {
    if is_owned(player, item.id) {
        return Err(ShopError::AlreadyOwned(item.name.to_string()));
    }
    if player.coins < item.cost {
        return Err(ShopError::InsufficientCoins {
            name: item.name.to_string(),
            missing: item.cost - player.coins,
        });
    }
    player.coins -= item.cost;
    player.unlocked_avatars.insert(item.id.to_string());
    info!(player = %player.name, avatar = item.name, cost = item.cost, "Avatar purchased");
    Ok(())
}

/// Wear an owned avatar.
pub fn select_avatar(player: &mut Player, id: &str) -> Result<(), ShopError> {
    if !is_owned(player, id) {
        return Err(ShopError::NotOwned);
    }
    player.avatar = id.to_string();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rich_player(coins: u32) -> Player {
        let mut player = Player::new("Ana", STARTER_AVATARS[0]);
        player.coins = coins;
        player
    }

    #[test]
    fn purchase_deducts_coins_and_grants_avatar() {
        let mut player = rich_player(75);
        purchase(&mut player, &CATALOGUE[0]).unwrap();
        assert_eq!(player.coins, 25);
        assert!(is_owned(&player, CATALOGUE[0].id));
    }

    #[test]
    fn purchase_reports_missing_coins() {
        let mut player = rich_player(30);
        let err = purchase(&mut player, &CATALOGUE[0]).unwrap_err();
        assert_eq!(
            err,
            ShopError::InsufficientCoins {
                name: "Iron Man".to_string(),
                missing: 20
            }
        );
        assert_eq!(player.coins, 30);
    }

    #[test]
    fn items_sharing_an_id_count_as_owned() {
        let mut player = rich_player(500);
        let torch = CATALOGUE.iter().find(|item| item.name == "Human Torch").unwrap();
        let gohan = CATALOGUE.iter().find(|item| item.name == "Gohan").unwrap();
        purchase(&mut player, torch).unwrap();
        assert_eq!(
            purchase(&mut player, gohan),
            Err(ShopError::AlreadyOwned("Gohan".to_string()))
        );
    }

    #[test]
    fn starter_avatar_cannot_be_bought_again() {
        let mut player = rich_player(500);
        let vegeta = CATALOGUE.iter().find(|item| item.name == "Vegeta").unwrap();
        assert!(matches!(
            purchase(&mut player, vegeta),
            Err(ShopError::AlreadyOwned(_))
        ));
        assert_eq!(player.coins, 500);
    }

    #[test]
    fn select_requires_ownership() {
        let mut player = rich_player(0);
        assert_eq!(select_avatar(&mut player, "🐉"), Err(ShopError::NotOwned));
        select_avatar(&mut player, "🤖").unwrap();
        assert_eq!(player.avatar, "🤖");
    }

    #[test]
    fn owned_avatars_lists_starters_first() {
        let mut player = rich_player(0);
        player.unlocked_avatars.insert("🐉".to_string());
        let owned = owned_avatars(&player);
        assert_eq!(owned.len(), STARTER_AVATARS.len() + 1);
        assert_eq!(owned.last().map(String::as_str), Some("🐉"));
    }
}
