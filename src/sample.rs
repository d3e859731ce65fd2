//! Demo ledger served when `SEED_SAMPLE_DATA` is on.

use chrono::NaiveDate;

use crate::balance::pin_split;
use crate::ledger::LedgerStore;
use crate::schemas::{Expense, ExpenseId, Group, GroupId, Member, DEFAULT_GROUP_IMAGE_URL};
use crate::taxonomy::{Category, PaymentMethod};

// name, image hint, running total, other members
const GROUPS: [(&str, &str, f64, &[&str]); 4] = [
    ("Goa Trip '24", "beach landscape", 25000.0, &["Ravi K", "Anjali V", "Priya G"]),
    ("Office Buddies", "office building", 7800.0, &["Aman M", "Kiran R"]),
    ("Flatmates", "apartment interior", 9200.0, &["Vikram P"]),
    ("Friends Hangout", "cafe interior", 4300.0, &["Ravi K", "Anjali V", "Sneha G", "Manoj J"]),
];

// description, category, date, amount, group, payment method
const EXPENSES: [(&str, Category, (i32, u32, u32), f64, &str, PaymentMethod); 11] = [
    ("Team Lunch at Chili's", Category::Food, (2024, 7, 22), 3250.0, "Office Buddies", PaymentMethod::Card),
    ("Weekend movie - Fighter", Category::Entertainment, (2024, 7, 21), 1200.0, "Friends Hangout", PaymentMethod::Upi),
    ("Grocery shopping", Category::Shopping, (2024, 7, 20), 2500.5, "Flatmates", PaymentMethod::Card),
    ("Goa Trip Flights", Category::Travel, (2024, 7, 18), 18500.0, "Goa Trip '24", PaymentMethod::Card),
    ("Ola ride to office", Category::Transport, (2024, 7, 17), 450.0, "Office Buddies", PaymentMethod::Upi),
    ("Electricity Bill", Category::Housing, (2024, 7, 15), 1800.0, "Flatmates", PaymentMethod::Upi),
    ("June Groceries", Category::Shopping, (2024, 6, 15), 4200.0, "Flatmates", PaymentMethod::Cash),
    ("Concert Tickets", Category::Entertainment, (2024, 6, 10), 3000.0, "Friends Hangout", PaymentMethod::Upi),
    ("Train to Mumbai", Category::Travel, (2024, 6, 5), 1500.0, "", PaymentMethod::Card),
    ("Doctor's visit", Category::Health, (2024, 5, 25), 800.0, "", PaymentMethod::Cash),
    ("New headphones", Category::Shopping, (2024, 5, 12), 5500.0, "", PaymentMethod::Card),
];

pub fn sample_ledger(owner: Member) -> LedgerStore {
    let groups: Vec<Group> = GROUPS
        .iter()
        .map(|(name, hint, total, others)| {
            let mut members = vec![owner.clone()];
            members.extend(others.iter().map(|name| Member::named(name)));
            Group {
                id: GroupId::new(),
                name: name.to_string(),
                image_url: DEFAULT_GROUP_IMAGE_URL.to_string(),
                image_hint: hint.to_string(),
                total_expenses: *total,
                members,
            }
        })
        .collect();

    let expenses: Vec<Expense> = EXPENSES
        .iter()
        .filter_map(|(description, category, (year, month, day), amount, group, method)| {
            let group = groups.iter().find(|g| g.name == *group);
            Some(Expense {
                id: ExpenseId::new(),
                description: description.to_string(),
                amount: *amount,
                category: *category,
                date: NaiveDate::from_ymd_opt(*year, *month, *day)?,
                group: group.map(|g| g.id),
                payment_method: *method,
                notes: None,
                split: group.map(|g| pin_split(None, &g.members, owner.id)),
            })
        })
        .collect();

    LedgerStore::from_parts(owner, expenses, groups)
}
