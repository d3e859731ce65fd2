use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assistant::ReceiptScan;
use crate::schemas::{
    ExpenseDraft, Group, GroupDraft, GroupId, MemberDraft, MemberId, MemberShare, Split, SplitMethod,
    DEFAULT_GROUP_IMAGE_URL,
};
use crate::taxonomy::{Category, PaymentMethod};

const CENT_TOLERANCE: f64 = 0.005;

/// Input rejected before it reaches the ledger.
#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("Please fill in the description, amount and category.")]
    MissingFields,
    #[error("The amount must be greater than zero.")]
    InvalidAmount,
    #[error("Couldn't find the group {0}")]
    UnknownGroup(GroupId),
    #[error("Invalid split: {0}")]
    InvalidSplit(String),
    #[error("Group name is required")]
    MissingGroupName,
    #[error("Member name is required")]
    MissingMemberName,
    #[error("Please enter both email and password.")]
    MissingCredentials,
    #[error("Please provide a description and at least 2 people.")]
    InvalidSuggestionInput,
    #[error("The receipt must be a base64 data URI.")]
    InvalidReceipt,
}

impl FormError {
    pub fn title(&self) -> &'static str {
        match self {
            FormError::MissingGroupName => "Group name is required",
            FormError::MissingCredentials => "Missing Fields",
            _ => "Invalid Input",
        }
    }
}

/// The add-expense form as the client submits it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpenseForm {
    pub description: String,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub group: Option<GroupId>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub split: Option<Split>,
}

impl ExpenseForm {
    pub fn validate(self, groups: &[Group], today: NaiveDate) -> Result<ExpenseDraft, FormError> {
        let description = self.description.trim().to_string();
        let category = self.category.as_deref().map(str::trim).unwrap_or_default();
        let (Some(amount), false, false) = (self.amount, description.is_empty(), category.is_empty()) else {
            return Err(FormError::MissingFields);
        };
        if !(amount.is_finite() && amount > 0.0) {
            return Err(FormError::InvalidAmount);
        }

        let group = match self.group {
            Some(id) => Some(
                groups
                    .iter()
                    .find(|group| group.id == id)
                    .ok_or(FormError::UnknownGroup(id))?,
            ),
            None => None,
        };
        if let Some(split) = &self.split {
            let group = group.ok_or_else(|| FormError::InvalidSplit("only group expenses can be split".to_string()))?;
            validate_split(split, amount, group)?;
        }

        Ok(ExpenseDraft {
            description,
            amount,
            category: Category::from_code(category).or_default(),
            date: self.date.unwrap_or(today),
            group: group.map(|group| group.id),
            payment_method: PaymentMethod::from_code(self.payment_method.as_deref().unwrap_or_default())
                .or_default(),
            notes: self
                .notes
                .map(|notes| notes.trim().to_string())
                .filter(|notes| !notes.is_empty()),
            split: self.split,
        })
    }

    /// Copies a receipt scan into the form. A category outside the taxonomy
    /// is dropped and leaves the current category alone.
    pub fn apply_receipt_scan(&mut self, scan: &ReceiptScan) {
        self.description = scan.description.clone();
        self.amount = Some(scan.amount);
        if Category::from_code(&scan.category).is_known() {
            self.category = Some(scan.category.clone());
        }
    }
}

fn validate_split(split: &Split, amount: f64, group: &Group) -> Result<(), FormError> {
    let roster: HashSet<MemberId> = group.members.iter().map(|member| member.id).collect();
    let invalid = |reason: &str| FormError::InvalidSplit(reason.to_string());

    if !roster.contains(&split.payer) {
        return Err(invalid("the payer is not a member of the group"));
    }
    let check_members = |members: &mut dyn Iterator<Item = MemberId>| -> Result<(), FormError> {
        let mut seen = HashSet::new();
        for member in members {
            if !roster.contains(&member) {
                return Err(invalid("a participant is not a member of the group"));
            }
            if !seen.insert(member) {
                return Err(invalid("a participant appears twice"));
            }
        }
        Ok(())
    };
    let check_shares = |shares: &[MemberShare]| -> Result<f64, FormError> {
        if shares.is_empty() {
            return Err(invalid("at least one participant is required"));
        }
        check_members(&mut shares.iter().map(|share| share.member))?;
        if shares.iter().any(|share| !share.value.is_finite() || share.value < 0.0) {
            return Err(invalid("shares cannot be negative"));
        }
        Ok(shares.iter().map(|share| share.value).sum())
    };

    match &split.method {
        SplitMethod::Equal { participants } => check_members(&mut participants.iter().copied()),
        SplitMethod::Exact { shares } => {
            let total = check_shares(shares)?;
            if (total - amount).abs() > CENT_TOLERANCE {
                return Err(invalid("exact amounts must add up to the expense amount"));
            }
            Ok(())
        }
        SplitMethod::Percentage { shares } => {
            let total = check_shares(shares)?;
            if (total - 100.0).abs() > CENT_TOLERANCE {
                return Err(invalid("percentages must add up to 100"));
            }
            Ok(())
        }
        SplitMethod::Shares { shares } => {
            if check_shares(shares)? <= 0.0 {
                return Err(invalid("at least one share must be positive"));
            }
            Ok(())
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GroupForm {
    pub name: String,
    pub image_url: Option<String>,
    pub image_hint: Option<String>,
}

impl GroupForm {
    pub fn validate(self) -> Result<GroupDraft, FormError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(FormError::MissingGroupName);
        }
        Ok(GroupDraft {
            name,
            image_url: self.image_url.unwrap_or_else(|| DEFAULT_GROUP_IMAGE_URL.to_string()),
            image_hint: self.image_hint.unwrap_or_else(|| "group image".to_string()),
        })
    }
}

pub fn validate_member(draft: MemberDraft) -> Result<MemberDraft, FormError> {
    let name = draft.name.trim().to_string();
    if name.is_empty() {
        return Err(FormError::MissingMemberName);
    }
    Ok(MemberDraft { name, ..draft })
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn validate(self) -> Result<Self, FormError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(FormError::MissingCredentials);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Member;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 22).unwrap()
    }

    fn lunch() -> ExpenseForm {
        ExpenseForm {
            description: "Lunch".to_string(),
            amount: Some(100.0),
            category: Some("Food".to_string()),
            ..ExpenseForm::default()
        }
    }

    fn flatmates(members: &[&Member]) -> Group {
        Group {
            id: GroupId::new(),
            name: "Flatmates".to_string(),
            image_url: String::new(),
            image_hint: String::new(),
            total_expenses: 9200.0,
            members: members.iter().map(|member| (*member).clone()).collect(),
        }
    }

    #[test]
    fn complete_form_becomes_draft() {
        let draft = lunch().validate(&[], today()).unwrap();
        assert_eq!(draft.description, "Lunch");
        assert_eq!(draft.category, Category::Food);
        assert_eq!(draft.payment_method, PaymentMethod::Card);
        assert_eq!(draft.date, today());
        assert_eq!(draft.notes, None);
    }

    #[test]
    fn missing_required_fields_are_rejected() {
        let no_description = ExpenseForm {
            description: "  ".to_string(),
            ..lunch()
        };
        assert_eq!(no_description.validate(&[], today()), Err(FormError::MissingFields));
        let no_amount = ExpenseForm { amount: None, ..lunch() };
        assert_eq!(no_amount.validate(&[], today()), Err(FormError::MissingFields));
        let no_category = ExpenseForm { category: None, ..lunch() };
        assert_eq!(no_category.validate(&[], today()), Err(FormError::MissingFields));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        for amount in [0.0, -5.0, f64::NAN] {
            let form = ExpenseForm {
                amount: Some(amount),
                ..lunch()
            };
            assert_eq!(form.validate(&[], today()), Err(FormError::InvalidAmount));
        }
    }

    #[test]
    fn unrecognized_codes_fall_back() {
        let form = ExpenseForm {
            category: Some("Pets".to_string()),
            payment_method: Some("Cheque".to_string()),
            ..lunch()
        };
        let draft = form.validate(&[], today()).unwrap();
        assert_eq!(draft.category, Category::Food);
        assert_eq!(draft.payment_method, PaymentMethod::Card);
    }

    #[test]
    fn group_must_exist() {
        let group = flatmates(&[&Member::named("You")]);
        let form = ExpenseForm {
            group: Some(group.id),
            ..lunch()
        };
        assert_eq!(form.clone().validate(&[group.clone()], today()).unwrap().group, Some(group.id));
        assert_eq!(form.validate(&[], today()), Err(FormError::UnknownGroup(group.id)));
    }

    #[test]
    fn splits_are_checked_against_the_roster() {
        let (you, vikram) = (Member::named("You"), Member::named("Vikram P"));
        let group = flatmates(&[&you, &vikram]);
        let exact = |a: f64, b: f64| Split {
            payer: you.id,
            method: SplitMethod::Exact {
                shares: vec![
                    MemberShare { member: you.id, value: a },
                    MemberShare { member: vikram.id, value: b },
                ],
            },
        };
        let form = |split: Split| ExpenseForm {
            group: Some(group.id),
            split: Some(split),
            ..lunch()
        };

        assert!(form(exact(60.0, 40.0)).validate(&[group.clone()], today()).is_ok());
        assert!(matches!(
            form(exact(60.0, 50.0)).validate(&[group.clone()], today()),
            Err(FormError::InvalidSplit(_))
        ));

        let stranger = Split {
            payer: MemberId::new(),
            method: SplitMethod::Equal { participants: vec![] },
        };
        assert!(matches!(
            form(stranger).validate(&[group.clone()], today()),
            Err(FormError::InvalidSplit(_))
        ));

        let percent = Split {
            payer: vikram.id,
            method: SplitMethod::Percentage {
                shares: vec![MemberShare { member: you.id, value: 90.0 }],
            },
        };
        assert!(matches!(
            form(percent).validate(&[group], today()),
            Err(FormError::InvalidSplit(_))
        ));
    }

    #[test]
    fn personal_expenses_cannot_be_split() {
        let you = Member::named("You");
        let form = ExpenseForm {
            split: Some(Split {
                payer: you.id,
                method: SplitMethod::Equal { participants: vec![] },
            }),
            ..lunch()
        };
        assert!(matches!(form.validate(&[], today()), Err(FormError::InvalidSplit(_))));
    }

    #[test]
    fn receipt_scan_fills_the_form() {
        let mut form = ExpenseForm::default();
        form.apply_receipt_scan(&ReceiptScan {
            description: "BBQ Nation".to_string(),
            amount: 3000.0,
            category: "Food".to_string(),
        });
        assert_eq!(form.description, "BBQ Nation");
        assert_eq!(form.amount, Some(3000.0));
        assert_eq!(form.category.as_deref(), Some("Food"));
    }

    #[test]
    fn unknown_scanned_category_leaves_field_alone() {
        let mut form = ExpenseForm {
            category: Some("Travel".to_string()),
            ..ExpenseForm::default()
        };
        form.apply_receipt_scan(&ReceiptScan {
            description: "Corner Store".to_string(),
            amount: 120.0,
            category: "Unknown".to_string(),
        });
        assert_eq!(form.category.as_deref(), Some("Travel"));
        assert_eq!(form.description, "Corner Store");
    }

    #[test]
    fn group_name_is_required() {
        assert_eq!(GroupForm::default().validate(), Err(FormError::MissingGroupName));
        let draft = GroupForm {
            name: "Goa Trip '25".to_string(),
            ..GroupForm::default()
        }
        .validate()
        .unwrap();
        assert_eq!(draft.image_url, DEFAULT_GROUP_IMAGE_URL);
    }

    #[test]
    fn credentials_need_both_fields() {
        let blank_password = Credentials {
            email: "a@b.co".to_string(),
            password: String::new(),
        };
        assert_eq!(blank_password.validate(), Err(FormError::MissingCredentials));
        assert_eq!(Credentials::default().validate(), Err(FormError::MissingCredentials));
    }
}
