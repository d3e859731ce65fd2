use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::taxonomy::{Category, PaymentMethod};

// Ids travel as plain strings both on the wire and in bson documents.
macro_rules! id_type {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

id_type!(ExpenseId);
id_type!(GroupId);
id_type!(MemberId);

impl MemberId {
    /// The roster id a signed-in user always gets, stable across restarts.
    pub fn for_user(user: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, user.as_bytes()))
    }
}

pub type UserId = String;

pub const DEFAULT_AVATAR_URL: &str = "https://placehold.co/40x40.png";
pub const DEFAULT_GROUP_IMAGE_URL: &str = "https://placehold.co/400x200.png";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub initials: String,
    pub avatar_url: String,
}

impl Member {
    pub fn named(name: &str) -> Self {
        Self {
            id: MemberId::new(),
            name: name.to_string(),
            initials: initials_of(name),
            avatar_url: DEFAULT_AVATAR_URL.to_string(),
        }
    }
}

/// First letter of the first two words, upper-cased.
pub fn initials_of(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|word| word.chars().next())
        .take(2)
        .flat_map(char::to_uppercase)
        .collect()
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub image_url: String,
    pub image_hint: String,
    pub total_expenses: f64,
    pub members: Vec<Member>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDraft {
    pub name: String,
    pub image_url: String,
    pub image_hint: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberShare {
    pub member: MemberId,
    pub value: f64,
}

/// How an expense divides between members.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SplitMethod {
    /// Empty `participants` means the whole roster.
    Equal {
        #[serde(default)]
        participants: Vec<MemberId>,
    },
    Exact { shares: Vec<MemberShare> },
    Percentage { shares: Vec<MemberShare> },
    Shares { shares: Vec<MemberShare> },
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Split {
    pub payer: MemberId,
    pub method: SplitMethod,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub amount: f64,
    pub category: Category,
    pub date: NaiveDate,
    pub group: Option<GroupId>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub split: Option<Split>,
}

/// An expense missing only its identifier.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDraft {
    pub description: String,
    pub amount: f64,
    pub category: Category,
    pub date: NaiveDate,
    pub group: Option<GroupId>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub split: Option<Split>,
}

impl ExpenseDraft {
    pub fn into_expense(self, id: ExpenseId) -> Expense {
        Expense {
            id,
            description: self.description,
            amount: self.amount,
            category: self.category,
            date: self.date,
            group: self.group,
            payment_method: self.payment_method,
            notes: self.notes,
            split: self.split,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "INR")]
    Inr,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "dd-mm-yyyy")]
    DayMonthYear,
    #[serde(rename = "mm-dd-yyyy")]
    MonthDayYear,
    #[serde(rename = "yyyy-mm-dd")]
    YearMonthDay,
}

impl DateFormat {
    pub fn format(self, date: NaiveDate) -> String {
        let pattern = match self {
            DateFormat::DayMonthYear => "%d-%m-%Y",
            DateFormat::MonthDayYear => "%m-%d-%Y",
            DateFormat::YearMonthDay => "%Y-%m-%d",
        };
        date.format(pattern).to_string()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub currency: Currency,
    pub date_format: DateFormat,
}
