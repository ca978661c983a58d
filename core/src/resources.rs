//! Resource catalogue shared by storage, housing and transport.

use serde::{Deserialize, Serialize};

/// Every tradeable good known to the settlement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Raw timber.
    Log,
    /// Sawn timber.
    Plank,
    /// Fuel made from timber.
    Charcoal,
    /// Quarried stone.
    Stone,
    /// Dug clay.
    Clay,
    /// Raw silk.
    Silk,
    /// Raw flax.
    Flax,
    /// Raw cotton.
    Cotton,
    /// Raw wool.
    Wool,
    /// Tier-1 grain.
    Barley,
    /// Tier-1 grain.
    Rice,
    /// Tier-1 grain.
    Corn,
    /// Tier-2 meat.
    Chicken,
    /// Tier-2 meat.
    Duck,
    /// Tier-2 catch.
    Fish,
    /// Tier-2 meat.
    Mutton,
    /// Tier-2 dairy.
    Milk,
    /// Tier-2 baked good.
    Bread,
    /// Tier-3 seasoning.
    Salt,
    /// Tier-3 baked good.
    Pastry,
    /// Tier-3 drink.
    Wine,
    /// Tier-3 drink.
    Tea,
    /// Tier-3 sweetener.
    Honey,
    /// Luxury good.
    Clothes,
    /// Luxury good.
    Furniture,
    /// Luxury good.
    Gems,
}

/// Quality tier of a food resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FoodTier {
    /// Staple grains.
    One,
    /// Meat, dairy and bread.
    Two,
    /// Delicacies.
    Three,
}

impl ResourceType {
    /// Every resource in catalogue order.
    pub const ALL: [ResourceType; 26] = [
        Self::Log,
        Self::Plank,
        Self::Charcoal,
        Self::Stone,
        Self::Clay,
        Self::Silk,
        Self::Flax,
        Self::Cotton,
        Self::Wool,
        Self::Barley,
        Self::Rice,
        Self::Corn,
        Self::Chicken,
        Self::Duck,
        Self::Fish,
        Self::Mutton,
        Self::Milk,
        Self::Bread,
        Self::Salt,
        Self::Pastry,
        Self::Wine,
        Self::Tea,
        Self::Honey,
        Self::Clothes,
        Self::Furniture,
        Self::Gems,
    ];

    /// Food tier of the resource, `None` for non-food goods.
    #[must_use]
    pub const fn food_tier(self) -> Option<FoodTier> {
        match self {
            Self::Barley | Self::Rice | Self::Corn => Some(FoodTier::One),
            Self::Chicken | Self::Duck | Self::Fish | Self::Mutton | Self::Milk | Self::Bread => {
                Some(FoodTier::Two)
            }
            Self::Salt | Self::Pastry | Self::Wine | Self::Tea | Self::Honey => {
                Some(FoodTier::Three)
            }
            _ => None,
        }
    }

    /// Reports whether the resource can be eaten.
    #[must_use]
    pub const fn is_food(self) -> bool {
        self.food_tier().is_some()
    }

    /// Reports whether the resource counts as a luxury good for housing.
    #[must_use]
    pub const fn is_luxury(self) -> bool {
        matches!(self, Self::Clothes | Self::Furniture | Self::Gems)
    }

    /// Foods of the provided tier in catalogue order.
    pub fn foods_of_tier(tier: FoodTier) -> impl Iterator<Item = ResourceType> {
        Self::ALL
            .into_iter()
            .filter(move |resource| resource.food_tier() == Some(tier))
    }
}
