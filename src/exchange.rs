use std::cmp::Reverse;
use std::collections::HashMap;
use std::mem::swap;

use serde::Serialize;

use crate::balance::{compute_balance_from_group, member_name, payer_and_shares, Balance};
use crate::schemas::{Expense, Group, MemberId};

/// A member's balance in cents; `order` is its position in the balance
/// table and breaks ties.
#[derive(Clone, Debug)]
pub struct PersonalBalance {
    pub id: MemberId,
    pub cents: i64,
    pub order: usize,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MemberPair {
    pub member1: MemberId,
    pub member2: MemberId,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub payer: MemberId,
    pub payer_name: String,
    pub receiver: MemberId,
    pub receiver_name: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct CentExchange {
    payer: MemberId,
    receiver: MemberId,
    cents: i64,
}

fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

fn from_cents(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Rounds every balance to cents and lets the largest balance absorb the
/// rounding remainder so the table sums to exactly zero. Members left at
/// zero are dropped.
pub fn round_balances(balance: &Balance) -> Vec<PersonalBalance> {
    let mut rounded: Vec<PersonalBalance> = balance
        .iter()
        .enumerate()
        .map(|(order, (id, amount))| PersonalBalance {
            id: *id,
            cents: to_cents(*amount),
            order,
        })
        .collect();

    let remainder: i64 = rounded.iter().map(|person| person.cents).sum();
    if remainder != 0 {
        if let Some(largest) = rounded
            .iter_mut()
            .max_by_key(|person| (person.cents.abs(), Reverse(person.order)))
        {
            largest.cents -= remainder;
        }
    }

    rounded.retain(|person| person.cents != 0);
    rounded
}

// The exchanges that will be made if no simplification happens
fn get_naive_exchanges(group: &Group, expenses: &[Expense], default_payer: MemberId) -> Vec<CentExchange> {
    let mut balances_between_people: HashMap<MemberPair, f64> = HashMap::new();

    for expense in expenses.iter().filter(|expense| expense.group == Some(group.id)) {
        let Some((payer, shares)) = payer_and_shares(expense, &group.members, default_payer) else {
            continue;
        };
        for (receiver, share) in shares {
            if receiver == payer {
                continue;
            }
            let mut pair = MemberPair {
                member1: payer,
                member2: receiver,
            };
            let mut amount = share;

            // Ordering the pair keeps every debt between the same two
            // members in one entry
            if pair.member1 > pair.member2 {
                swap(&mut pair.member1, &mut pair.member2);
                amount = -amount;
            }

            *balances_between_people.entry(pair).or_insert(0.0) += amount;
        }
    }

    // Positive balances mean member2 owes member1
    let mut exchanges = Vec::new();
    for (pair, balance) in balances_between_people {
        let cents = to_cents(balance);
        if cents == 0 {
            continue;
        }
        let mut payer = pair.member2;
        let mut receiver = pair.member1;
        if cents < 0 {
            swap(&mut payer, &mut receiver);
        }
        exchanges.push(CentExchange {
            payer,
            receiver,
            cents: cents.abs(),
        });
    }
    exchanges.sort_by_key(|exchange| (Reverse(exchange.cents), exchange.payer, exchange.receiver));
    exchanges
}

// Repeatedly settles the largest creditor against the largest debtor
fn get_simplified_exchanges(balances: &[PersonalBalance]) -> Vec<CentExchange> {
    let mut payers: Vec<PersonalBalance> = balances
        .iter()
        .filter(|person| person.cents < 0)
        .map(|person| PersonalBalance {
            cents: -person.cents,
            ..person.clone()
        })
        .collect();
    let mut receivers: Vec<PersonalBalance> = balances.iter().filter(|person| person.cents > 0).cloned().collect();

    let mut exchanges = Vec::new();
    while !payers.is_empty() && !receivers.is_empty() {
        payers.sort_by_key(|person| (person.cents, Reverse(person.order)));
        receivers.sort_by_key(|person| (person.cents, Reverse(person.order)));
        let (Some(payer), Some(receiver)) = (payers.last_mut(), receivers.last_mut()) else {
            break;
        };

        let cents = payer.cents.min(receiver.cents);
        exchanges.push(CentExchange {
            payer: payer.id,
            receiver: receiver.id,
            cents,
        });
        payer.cents -= cents;
        receiver.cents -= cents;

        if payer.cents == 0 {
            payers.pop();
        }
        if receiver.cents == 0 {
            receivers.pop();
        }
    }
    exchanges
}

fn net_flows(exchanges: &[CentExchange]) -> HashMap<MemberId, i64> {
    let mut flows: HashMap<MemberId, i64> = HashMap::new();
    for exchange in exchanges {
        *flows.entry(exchange.receiver).or_insert(0) += exchange.cents;
        *flows.entry(exchange.payer).or_insert(0) -= exchange.cents;
    }
    flows.retain(|_, cents| *cents != 0);
    flows
}

fn describe(group: &Group, exchanges: Vec<CentExchange>) -> Vec<Exchange> {
    exchanges
        .into_iter()
        .map(|exchange| Exchange {
            payer: exchange.payer,
            payer_name: member_name(group, exchange.payer),
            receiver: exchange.receiver,
            receiver_name: member_name(group, exchange.receiver),
            amount: from_cents(exchange.cents),
        })
        .collect()
}

/// Direct debts between pairs of members, without simplification.
pub fn get_pairwise_debts(group: &Group, expenses: &[Expense], default_payer: MemberId) -> Vec<Exchange> {
    describe(group, get_naive_exchanges(group, expenses, default_payer))
}

pub fn get_exchanges_from_group(group: &Group, expenses: &[Expense], default_payer: MemberId) -> Vec<Exchange> {
    let people_balances = compute_balance_from_group(group, expenses, default_payer);
    let rounded = round_balances(&people_balances);

    let simplified_exchanges = get_simplified_exchanges(&rounded);
    let naive_exchanges = get_naive_exchanges(group, expenses, default_payer);

    // The direct debts win only when they are shorter and move exactly the
    // same money as the rounded balances
    let expected: HashMap<MemberId, i64> = rounded.iter().map(|person| (person.id, person.cents)).collect();
    if naive_exchanges.len() < simplified_exchanges.len() && net_flows(&naive_exchanges) == expected {
        describe(group, naive_exchanges)
    } else {
        describe(group, simplified_exchanges)
    }
}
