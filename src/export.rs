use thiserror::Error;

use crate::ledger::LedgerStore;
use crate::schemas::Expense;

pub const CSV_HEADER: [&str; 8] = [
    "ID",
    "Description",
    "Amount",
    "Category",
    "Date",
    "Group",
    "Payment Method",
    "Notes",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("couldn't write the CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("couldn't finish the CSV: {0}")]
    Flush(String),
    #[error("the CSV is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn expense_row(ledger: &LedgerStore, expense: &Expense) -> [String; 8] {
    let group = expense
        .group
        .and_then(|id| ledger.group(id))
        .map(|group| group.name.clone())
        .unwrap_or_default();
    [
        expense.id.to_string(),
        expense.description.clone(),
        format!("{:.2}", expense.amount),
        expense.category.code().to_string(),
        ledger.preferences().date_format.format(expense.date),
        group,
        expense.payment_method.code().to_string(),
        expense.notes.clone().unwrap_or_default(),
    ]
}

/// The whole expense collection, newest first, as CSV with CRLF line ends.
pub fn expenses_to_csv(ledger: &LedgerStore) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for expense in ledger.expenses() {
        writer.write_record(expense_row(ledger, expense))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Flush(err.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{DateFormat, ExpenseDraft, GroupDraft, Member, Preferences};
    use crate::taxonomy::{Category, PaymentMethod};
    use chrono::NaiveDate;

    fn ledger() -> LedgerStore {
        let mut ledger = LedgerStore::new(Member::named("Shishir Nikam"));
        let office = ledger.add_group(GroupDraft {
            name: "Office Buddies".to_string(),
            image_url: String::new(),
            image_hint: String::new(),
        });
        ledger.add_expense(ExpenseDraft {
            description: "Team Lunch at Chili's, \"Friday\"".to_string(),
            amount: 3250.0,
            category: Category::Food,
            date: NaiveDate::from_ymd_opt(2024, 7, 22).unwrap(),
            group: Some(office.id),
            payment_method: PaymentMethod::Card,
            notes: Some("split later".to_string()),
            split: None,
        });
        ledger
    }

    #[test]
    fn header_has_fixed_column_order() {
        let csv = expenses_to_csv(&LedgerStore::new(Member::named("You"))).unwrap();
        assert_eq!(csv, "ID,Description,Amount,Category,Date,Group,Payment Method,Notes\r\n");
    }

    #[test]
    fn rows_quote_awkward_fields() {
        let ledger = ledger();
        let csv = expenses_to_csv(&ledger).unwrap();
        let row = csv.lines().nth(1).unwrap();
        let id = ledger.expenses()[0].id;
        assert_eq!(
            row,
            format!(
                "{id},\"Team Lunch at Chili's, \"\"Friday\"\"\",3250.00,Food,22-07-2024,Office Buddies,Card,split later"
            )
        );
    }

    #[test]
    fn dates_follow_the_preference() {
        let mut ledger = ledger();
        ledger.set_preferences(Preferences {
            date_format: DateFormat::YearMonthDay,
            ..Preferences::default()
        });
        assert!(expenses_to_csv(&ledger).unwrap().contains(",2024-07-22,"));
    }
}
