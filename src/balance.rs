use indexmap::IndexMap;
use serde::Serialize;

use crate::schemas::{Expense, Group, Member, MemberId, Split, SplitMethod};

pub type Balance = IndexMap<MemberId, f64>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberBalance {
    pub member: MemberId,
    pub name: String,
    pub balance: f64,
}

/// What each member owes for one expense. Members outside the split are
/// absent; an empty result means the split is unusable.
pub fn shares_of(expense_amount: f64, method: &SplitMethod, roster: &[Member]) -> Vec<(MemberId, f64)> {
    match method {
        SplitMethod::Equal { participants } => {
            let participants: Vec<MemberId> = if participants.is_empty() {
                roster.iter().map(|member| member.id).collect()
            } else {
                participants.clone()
            };
            if participants.is_empty() {
                return Vec::new();
            }
            let amount_per_participant = expense_amount / participants.len() as f64;
            participants
                .into_iter()
                .map(|member| (member, amount_per_participant))
                .collect()
        }
        SplitMethod::Exact { shares } => shares.iter().map(|share| (share.member, share.value)).collect(),
        SplitMethod::Percentage { shares } => shares
            .iter()
            .map(|share| (share.member, expense_amount * share.value / 100.0))
            .collect(),
        SplitMethod::Shares { shares } => {
            let total_weight: f64 = shares.iter().map(|share| share.value).sum();
            if total_weight <= 0.0 {
                return Vec::new();
            }
            shares
                .iter()
                .map(|share| (share.member, expense_amount * share.value / total_weight))
                .collect()
        }
    }
}

/// The split an expense is stored with. A missing split, or an equal split
/// naming nobody, is fixed to the roster as it is now, so members who join
/// later are never billed for it.
pub fn pin_split(split: Option<Split>, roster: &[Member], default_payer: MemberId) -> Split {
    let everyone = || SplitMethod::Equal {
        participants: roster.iter().map(|member| member.id).collect(),
    };
    match split {
        None => Split {
            payer: default_payer,
            method: everyone(),
        },
        Some(Split {
            payer,
            method: SplitMethod::Equal { participants },
        }) if participants.is_empty() => Split {
            payer,
            method: everyone(),
        },
        Some(split) => split,
    }
}

/// Who paid an expense and what each member owes for it. Only records
/// stored before splits were pinned lack one; they count as paid by
/// `default_payer` and split equally across the roster.
pub fn payer_and_shares(
    expense: &Expense,
    roster: &[Member],
    default_payer: MemberId,
) -> Option<(MemberId, Vec<(MemberId, f64)>)> {
    let equal = SplitMethod::Equal { participants: Vec::new() };
    let (payer, method) = match &expense.split {
        Some(split) => (split.payer, &split.method),
        None => (default_payer, &equal),
    };
    let shares = shares_of(expense.amount, method, roster);
    if shares.is_empty() {
        None
    } else {
        Some((payer, shares))
    }
}

/// Net balance per member: positive means the group owes them money.
/// Roster members always appear, in roster order, even when nothing
/// concerns them.
pub fn compute_balance_from_group(group: &Group, expenses: &[Expense], default_payer: MemberId) -> Balance {
    let mut balance: Balance = group.members.iter().map(|member| (member.id, 0.0)).collect();

    for expense in expenses.iter().filter(|expense| expense.group == Some(group.id)) {
        let Some((payer, shares)) = payer_and_shares(expense, &group.members, default_payer) else {
            continue;
        };
        *balance.entry(payer).or_insert(0.0) += expense.amount;
        for (member, share) in shares {
            *balance.entry(member).or_insert(0.0) -= share;
        }
    }
    balance
}

pub fn describe_balance(group: &Group, balance: &Balance) -> Vec<MemberBalance> {
    balance
        .iter()
        .map(|(id, amount)| MemberBalance {
            member: *id,
            name: member_name(group, *id),
            balance: round_to_2_decimals(*amount),
        })
        .collect()
}

pub fn member_name(group: &Group, id: MemberId) -> String {
    group
        .members
        .iter()
        .find(|member| member.id == id)
        .map(|member| member.name.clone())
        .unwrap_or_else(|| id.to_string())
}

pub fn round_to_2_decimals(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}
