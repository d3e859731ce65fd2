//! Fixed category and payment-method tables.
//!
//! Lookups are total: an unrecognized code resolves to the `Unknown` variant,
//! whose display metadata is the first entry of its table.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, PartialEq, Eq)]
pub struct CategoryInfo {
    pub value: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

#[derive(Debug, PartialEq, Eq)]
pub struct PaymentMethodInfo {
    pub value: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

pub static CATEGORIES: [CategoryInfo; 7] = [
    CategoryInfo {
        value: "Food",
        label: "Food & Dining",
        icon: "utensils",
        color: "purple",
    },
    CategoryInfo {
        value: "Shopping",
        label: "Shopping",
        icon: "shopping-cart",
        color: "orange",
    },
    CategoryInfo {
        value: "Transport",
        label: "Transportation",
        icon: "car",
        color: "sky",
    },
    CategoryInfo {
        value: "Housing",
        label: "Housing & Utilities",
        icon: "home",
        color: "lime",
    },
    CategoryInfo {
        value: "Entertainment",
        label: "Entertainment",
        icon: "film",
        color: "red",
    },
    CategoryInfo {
        value: "Health",
        label: "Health & Wellness",
        icon: "heart-pulse",
        color: "fuchsia",
    },
    CategoryInfo {
        value: "Travel",
        label: "Travel",
        icon: "plane",
        color: "cyan",
    },
];

pub static PAYMENT_METHODS: [PaymentMethodInfo; 3] = [
    PaymentMethodInfo {
        value: "Card",
        label: "Card",
        icon: "credit-card",
    },
    PaymentMethodInfo {
        value: "UPI",
        label: "UPI",
        icon: "smartphone",
    },
    PaymentMethodInfo {
        value: "Cash",
        label: "Cash",
        icon: "wallet",
    },
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Food,
    Shopping,
    Transport,
    Housing,
    Entertainment,
    Health,
    Travel,
    Unknown,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Food,
        Category::Shopping,
        Category::Transport,
        Category::Housing,
        Category::Entertainment,
        Category::Health,
        Category::Travel,
    ];

    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|category| category.info().value == code)
            .unwrap_or(Category::Unknown)
    }

    pub fn info(self) -> &'static CategoryInfo {
        let index = match self {
            Category::Food | Category::Unknown => 0,
            Category::Shopping => 1,
            Category::Transport => 2,
            Category::Housing => 3,
            Category::Entertainment => 4,
            Category::Health => 5,
            Category::Travel => 6,
        };
        &CATEGORIES[index]
    }

    pub fn is_known(self) -> bool {
        self != Category::Unknown
    }

    /// Replaces `Unknown` with the default table entry.
    pub fn or_default(self) -> Self {
        if self.is_known() {
            self
        } else {
            Category::ALL[0]
        }
    }

    pub fn code(self) -> &'static str {
        self.info().value
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Card,
    Upi,
    Cash,
    Unknown,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Card, PaymentMethod::Upi, PaymentMethod::Cash];

    pub fn from_code(code: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|method| method.info().value == code)
            .unwrap_or(PaymentMethod::Unknown)
    }

    pub fn info(self) -> &'static PaymentMethodInfo {
        let index = match self {
            PaymentMethod::Card | PaymentMethod::Unknown => 0,
            PaymentMethod::Upi => 1,
            PaymentMethod::Cash => 2,
        };
        &PAYMENT_METHODS[index]
    }

    pub fn is_known(self) -> bool {
        self != PaymentMethod::Unknown
    }

    pub fn or_default(self) -> Self {
        if self.is_known() {
            self
        } else {
            PaymentMethod::ALL[0]
        }
    }

    pub fn code(self) -> &'static str {
        self.info().value
    }
}

pub fn lookup_category(code: &str) -> &'static CategoryInfo {
    Category::from_code(code).info()
}

pub fn lookup_payment_method(code: &str) -> &'static PaymentMethodInfo {
    PaymentMethod::from_code(code).info()
}

// On the wire both enums are their table code; unknown codes never fail to
// deserialize and serialize back as the default entry.

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Category::from_code(&code))
    }
}

impl Serialize for PaymentMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for PaymentMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(PaymentMethod::from_code(&code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_resolve_to_their_entry() {
        assert_eq!(lookup_category("Travel").label, "Travel");
        assert_eq!(lookup_category("Housing").label, "Housing & Utilities");
        assert_eq!(lookup_payment_method("UPI").icon, "smartphone");
    }

    #[test]
    fn unknown_codes_fall_back_to_first_entry() {
        for code in ["", "Unknown", "food", "Groceries", "💸"] {
            assert_eq!(lookup_category(code), &CATEGORIES[0]);
            assert_eq!(lookup_payment_method(code), &PAYMENT_METHODS[0]);
        }
    }

    #[test]
    fn unknown_variant_is_distinguishable() {
        assert!(!Category::from_code("Unknown").is_known());
        assert_eq!(Category::from_code("Unknown").or_default(), Category::Food);
        assert!(PaymentMethod::from_code("Cash").is_known());
    }

    #[test]
    fn unrecognized_wire_codes_deserialize() {
        let category: Category = serde_json::from_str("\"Pets\"").unwrap();
        assert_eq!(category, Category::Unknown);
        assert_eq!(serde_json::to_string(&category).unwrap(), "\"Food\"");
        let method: PaymentMethod = serde_json::from_str("\"UPI\"").unwrap();
        assert_eq!(method, PaymentMethod::Upi);
    }
}
