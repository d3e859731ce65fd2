use thiserror::Error;

use crate::balance::pin_split;
use crate::schemas::{
    Expense, ExpenseDraft, ExpenseId, Group, GroupDraft, GroupId, Member, MemberDraft, Preferences,
    DEFAULT_AVATAR_URL,
};

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("Couldn't find the group {0}")]
    GroupNotFound(GroupId),
}

/// The expenses and groups of one user. Mutation methods are the only way
/// to change them; the store trusts its input and validates nothing.
#[derive(Clone, Debug)]
pub struct LedgerStore {
    owner: Member,
    expenses: Vec<Expense>,
    groups: Vec<Group>,
    preferences: Preferences,
}

impl LedgerStore {
    pub fn new(owner: Member) -> Self {
        Self {
            owner,
            expenses: Vec::new(),
            groups: Vec::new(),
            preferences: Preferences::default(),
        }
    }

    /// Rebuilds a store from collections that are already newest first.
    pub fn from_parts(owner: Member, expenses: Vec<Expense>, groups: Vec<Group>) -> Self {
        Self {
            owner,
            expenses,
            groups,
            preferences: Preferences::default(),
        }
    }

    pub fn owner(&self) -> &Member {
        &self.owner
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|group| group.id == id)
    }

    pub fn expenses_for_group(&self, id: GroupId) -> Vec<Expense> {
        self.expenses
            .iter()
            .filter(|expense| expense.group == Some(id))
            .cloned()
            .collect()
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences
    }

    pub fn set_preferences(&mut self, preferences: Preferences) {
        self.preferences = preferences;
    }

    pub fn add_expense(&mut self, draft: ExpenseDraft) -> Expense {
        let mut expense = draft.into_expense(ExpenseId::new());
        if let Some(group_id) = expense.group {
            if let Some(group) = self.groups.iter_mut().find(|group| group.id == group_id) {
                group.total_expenses += expense.amount;
                expense.split = Some(pin_split(expense.split.take(), &group.members, self.owner.id));
            }
        }
        self.expenses.insert(0, expense.clone());
        expense
    }

    pub fn add_group(&mut self, draft: GroupDraft) -> Group {
        let group = Group {
            id: GroupId::new(),
            name: draft.name,
            image_url: draft.image_url,
            image_hint: draft.image_hint,
            total_expenses: 0.0,
            members: vec![self.owner.clone()],
        };
        self.groups.insert(0, group.clone());
        group
    }

    pub fn add_member(&mut self, group_id: GroupId, draft: MemberDraft) -> Result<Member, LedgerError> {
        let group = self
            .groups
            .iter_mut()
            .find(|group| group.id == group_id)
            .ok_or(LedgerError::GroupNotFound(group_id))?;
        let mut member = Member::named(&draft.name);
        member.avatar_url = draft
            .avatar_url
            .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string());
        group.members.push(member.clone());
        Ok(member)
    }
}
