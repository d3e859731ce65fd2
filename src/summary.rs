//! Spending aggregates and the dashboard figures derived from a ledger.

use chrono::Datelike;
use indexmap::IndexMap;
use serde::Serialize;

use crate::balance::{compute_balance_from_group, round_to_2_decimals};
use crate::ledger::LedgerStore;
use crate::schemas::Expense;
use crate::taxonomy::Category;

pub const MONTH_ORDER: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MonthTotal {
    pub month: &'static str,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub total_spent: f64,
    pub you_owe: f64,
    pub owe_group_count: usize,
    pub you_are_owed: f64,
    pub owed_group_count: usize,
    pub active_groups: usize,
    pub by_category: Vec<CategoryTotal>,
    pub by_month: Vec<MonthTotal>,
}

/// Totals per category, in the order categories first appear.
pub fn category_totals(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: IndexMap<Category, f64> = IndexMap::new();
    for expense in expenses {
        *totals.entry(expense.category).or_insert(0.0) += expense.amount;
    }
    totals
        .into_iter()
        .map(|(category, amount)| CategoryTotal { category, amount })
        .collect()
}

/// Totals per calendar month, Jan first, whatever the input order. Years
/// are folded together.
pub fn monthly_totals(expenses: &[Expense]) -> Vec<MonthTotal> {
    let mut buckets: [Option<f64>; 12] = [None; 12];
    for expense in expenses {
        let slot = &mut buckets[expense.date.month0() as usize];
        *slot = Some(slot.unwrap_or(0.0) + expense.amount);
    }
    buckets
        .iter()
        .enumerate()
        .filter_map(|(index, amount)| {
            amount.map(|amount| MonthTotal {
                month: MONTH_ORDER[index],
                amount,
            })
        })
        .collect()
}

pub fn total_spent(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|expense| expense.amount).sum()
}

pub fn dashboard(ledger: &LedgerStore) -> Dashboard {
    let owner = ledger.owner().id;
    let mut you_owe = 0.0;
    let mut you_are_owed = 0.0;
    let mut owe_group_count = 0;
    let mut owed_group_count = 0;

    for group in ledger.groups() {
        let balance = compute_balance_from_group(group, ledger.expenses(), owner);
        let own = round_to_2_decimals(balance.get(&owner).copied().unwrap_or(0.0));
        if own > 0.0 {
            you_are_owed += own;
            owed_group_count += 1;
        } else if own < 0.0 {
            you_owe += -own;
            owe_group_count += 1;
        }
    }

    let expenses = ledger.expenses();
    Dashboard {
        total_spent: total_spent(expenses),
        you_owe: round_to_2_decimals(you_owe),
        owe_group_count,
        you_are_owed: round_to_2_decimals(you_are_owed),
        owed_group_count,
        active_groups: ledger.groups().len(),
        by_category: category_totals(expenses),
        by_month: monthly_totals(expenses),
    }
}
