use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOptions, ReplaceOptions},
    Client, Collection,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schemas::{Expense, Group, GroupId, Member, Preferences, UserId};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("couldn't encode the document: {0}")]
    Encoding(#[from] bson::ser::Error),
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpenseRecord {
    owner: UserId,
    created_at: bson::DateTime,
    expense: Expense,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupRecord {
    owner: UserId,
    created_at: bson::DateTime,
    group: Group,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct PreferencesRecord {
    owner: UserId,
    preferences: Preferences,
}

/// Everything archived for one owner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArchivedLedger {
    pub expenses: Vec<Expense>,
    pub groups: Vec<Group>,
    pub preferences: Option<Preferences>,
}

impl ArchivedLedger {
    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty() && self.groups.is_empty() && self.preferences.is_none()
    }
}

/// Write-through copy of every ledger in MongoDB: one document per expense,
/// per group, and per owner's preferences.
#[derive(Clone)]
pub struct MongoArchive {
    expenses: Collection<ExpenseRecord>,
    groups: Collection<GroupRecord>,
    preferences: Collection<PreferencesRecord>,
}

impl MongoArchive {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, ArchiveError> {
        let client = Client::with_uri_str(uri).await?;
        let database = client.database(database);
        Ok(Self {
            expenses: database.collection("Expenses"),
            groups: database.collection("Groups"),
            preferences: database.collection("Preferences"),
        })
    }

    pub async fn save_expense(&self, owner: &str, expense: &Expense) -> Result<(), ArchiveError> {
        let record = ExpenseRecord {
            owner: owner.to_string(),
            created_at: bson::DateTime::now(),
            expense: expense.clone(),
        };
        self.expenses.insert_one(record, None).await?;

        if let Some(group) = expense.group {
            self.groups
                .update_one(
                    doc! { "owner": owner, "group.id": group.to_string() },
                    doc! { "$inc": { "group.totalExpenses": expense.amount } },
                    None,
                )
                .await?;
        }
        Ok(())
    }

    pub async fn save_group(&self, owner: &str, group: &Group) -> Result<(), ArchiveError> {
        let record = GroupRecord {
            owner: owner.to_string(),
            created_at: bson::DateTime::now(),
            group: group.clone(),
        };
        self.groups.insert_one(record, None).await?;
        Ok(())
    }

    pub async fn save_member(&self, owner: &str, group: GroupId, member: &Member) -> Result<(), ArchiveError> {
        self.groups
            .update_one(
                doc! { "owner": owner, "group.id": group.to_string() },
                doc! { "$push": { "group.members": bson::to_bson(member)? } },
                None,
            )
            .await?;
        Ok(())
    }

    pub async fn save_preferences(&self, owner: &str, preferences: Preferences) -> Result<(), ArchiveError> {
        let record = PreferencesRecord {
            owner: owner.to_string(),
            preferences,
        };
        self.preferences
            .replace_one(
                doc! { "owner": owner },
                record,
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await?;
        Ok(())
    }

    /// Everything of one owner, expenses and groups newest first.
    pub async fn load(&self, owner: &str) -> Result<ArchivedLedger, ArchiveError> {
        let newest_first = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();

        let expenses: Vec<ExpenseRecord> = self
            .expenses
            .find(doc! { "owner": owner }, newest_first.clone())
            .await?
            .try_collect()
            .await?;
        let groups: Vec<GroupRecord> = self
            .groups
            .find(doc! { "owner": owner }, newest_first)
            .await?
            .try_collect()
            .await?;
        let preferences = self.preferences.find_one(doc! { "owner": owner }, None).await?;

        Ok(ArchivedLedger {
            expenses: expenses.into_iter().map(|record| record.expense).collect(),
            groups: groups.into_iter().map(|record| record.group).collect(),
            preferences: preferences.map(|record| record.preferences),
        })
    }
}
