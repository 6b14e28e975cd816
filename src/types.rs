use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction classification. OFX has a longer list of `TRNTYPE` codes; they
/// fold into these variants through [`TRANSACTION_TYPE_CODES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Credit,
    Debit,
    Check,
    Transfer,
    Interest,
    Fee,
    Other,
}

/// `TRNTYPE` code to transaction type. Codes not listed map to
/// [`TransactionType::Other`] with a warning.
pub const TRANSACTION_TYPE_CODES: &[(&str, TransactionType)] = &[
    ("CREDIT", TransactionType::Credit),
    ("DEP", TransactionType::Credit),
    ("DIRECTDEP", TransactionType::Credit),
    ("DEBIT", TransactionType::Debit),
    ("POS", TransactionType::Debit),
    ("ATM", TransactionType::Debit),
    ("PAYMENT", TransactionType::Debit),
    ("DIRECTDEBIT", TransactionType::Debit),
    ("REPEATPMT", TransactionType::Debit),
    ("CASH", TransactionType::Debit),
    ("CHECK", TransactionType::Check),
    ("XFER", TransactionType::Transfer),
    ("INT", TransactionType::Interest),
    ("DIV", TransactionType::Interest),
    ("FEE", TransactionType::Fee),
    ("SRVCHG", TransactionType::Fee),
    ("HOLD", TransactionType::Other),
    ("OTHER", TransactionType::Other),
];

impl TransactionType {
    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        TRANSACTION_TYPE_CODES
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(code))
            .map(|(_, kind)| *kind)
    }

    /// Canonical code written by the serializer.
    pub fn code(self) -> &'static str {
        match self {
            TransactionType::Credit => "CREDIT",
            TransactionType::Debit => "DEBIT",
            TransactionType::Check => "CHECK",
            TransactionType::Transfer => "XFER",
            TransactionType::Interest => "INT",
            TransactionType::Fee => "FEE",
            TransactionType::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Checking,
    Savings,
    MoneyMarket,
    CreditLine,
    CertificateOfDeposit,
    CreditCard,
    Investment,
}

impl AccountType {
    /// Parses a bank `ACCTTYPE` code. Credit card and investment accounts are
    /// identified by their message set instead.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "CHECKING" => Some(AccountType::Checking),
            "SAVINGS" => Some(AccountType::Savings),
            "MONEYMRKT" => Some(AccountType::MoneyMarket),
            "CREDITLINE" => Some(AccountType::CreditLine),
            "CD" => Some(AccountType::CertificateOfDeposit),
            _ => None,
        }
    }

    pub fn code(self) -> Option<&'static str> {
        match self {
            AccountType::Checking => Some("CHECKING"),
            AccountType::Savings => Some("SAVINGS"),
            AccountType::MoneyMarket => Some("MONEYMRKT"),
            AccountType::CreditLine => Some("CREDITLINE"),
            AccountType::CertificateOfDeposit => Some("CD"),
            AccountType::CreditCard | AccountType::Investment => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialInstitution {
    pub organization: Option<String>,
    pub fid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDescriptor {
    pub account_id: String,
    /// Routing number for bank accounts, broker id for investment accounts.
    pub bank_id: Option<String>,
    pub branch_id: Option<String>,
    pub account_type: AccountType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub amount: Decimal,
    pub as_of: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub posted: Option<DateTime<FixedOffset>>,
    pub user_date: Option<DateTime<FixedOffset>>,
    /// Institution-assigned id, or a synthesized key when `unstable_id` is set.
    pub fitid: String,
    pub unstable_id: bool,
    pub name: Option<String>,
    pub memo: Option<String>,
    pub check_number: Option<String>,
}

impl Transaction {
    /// FITID equality, the natural key callers dedup on.
    pub fn same_fitid(&self, other: &Transaction) -> bool {
        self.fitid == other.fitid
    }
}

/// One account's statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementResponse {
    pub institution: Option<FinancialInstitution>,
    pub account: AccountDescriptor,
    /// ISO 4217 code, upper case.
    pub currency: String,
    pub ledger_balance: Option<Balance>,
    pub available_balance: Option<Balance>,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub transactions: Vec<Transaction>,
}

impl StatementResponse {
    /// FITIDs shared by more than one transaction, in order of first appearance.
    /// Duplicates are kept in `transactions`; removing them is up to the caller.
    pub fn duplicate_fitids(&self) -> Vec<&str> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for txn in &self.transactions {
            *counts.entry(txn.fitid.as_str()).or_default() += 1;
        }

        let mut seen = Vec::new();
        for txn in &self.transactions {
            let fitid = txn.fitid.as_str();
            if counts[fitid] > 1 && !seen.contains(&fitid) {
                seen.push(fitid);
            }
        }
        seen
    }
}
