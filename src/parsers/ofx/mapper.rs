use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

use super::tags;
use super::tree::Node;
use super::types::{OfxAmount, OfxDate, normalize_currency};
use crate::builder::ParseOptions;
use crate::errors::{OfxError, OfxResult, TagPath, WarningKind, Warnings};
use crate::types::{
    AccountDescriptor, AccountType, Balance, FinancialInstitution, StatementResponse, Transaction,
    TransactionType,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MessageSet {
    Bank,
    CreditCard,
    Investment,
}

impl MessageSet {
    fn from_tag(name: &str) -> Option<Self> {
        match name {
            "STMTRS" => Some(Self::Bank),
            "CCSTMTRS" => Some(Self::CreditCard),
            "INVSTMTRS" => Some(Self::Investment),
            _ => None,
        }
    }

    fn account_tag(self) -> &'static str {
        match self {
            Self::Bank => "BANKACCTFROM",
            Self::CreditCard => "CCACCTFROM",
            Self::Investment => "INVACCTFROM",
        }
    }

    fn transaction_list_tag(self) -> &'static str {
        match self {
            Self::Bank | Self::CreditCard => "BANKTRANLIST",
            Self::Investment => "INVTRANLIST",
        }
    }
}

/// Walks the document tree and builds statements from every statement
/// aggregate it finds, at any depth.
pub(crate) struct Mapper<'a> {
    options: &'a ParseOptions,
    institution: Option<FinancialInstitution>,
    warnings: Warnings,
}

impl<'a> Mapper<'a> {
    pub(crate) fn new(options: &'a ParseOptions) -> Self {
        Self {
            options,
            institution: None,
            warnings: Warnings::default(),
        }
    }

    pub(crate) fn map(mut self, root: &Node) -> OfxResult<(Vec<StatementResponse>, Warnings)> {
        let mut statements = Vec::new();
        self.visit(root, &TagPath::root(), &mut statements);

        if statements.is_empty() {
            return Err(OfxError::NoStatementFound);
        }
        if let Some(institution) = &self.institution {
            for statement in &mut statements {
                statement.institution = Some(institution.clone());
            }
        }

        tracing::debug!(statements = statements.len(), "mapped document tree");
        Ok((statements, self.warnings))
    }

    fn visit(&mut self, node: &Node, path: &TagPath, out: &mut Vec<StatementResponse>) {
        for child in &node.children {
            let child_path = path.child(&child.name);
            if let Some(set) = MessageSet::from_tag(&child.name) {
                out.push(self.statement(child, &child_path, set));
            } else if child.name == "SONRS" {
                self.signon(child, &child_path);
            } else if !tags::is_known(&child.name) {
                self.unknown(child, child_path);
            } else if !child.is_leaf() {
                self.visit(child, &child_path, out);
            }
        }
    }

    fn unknown(&mut self, node: &Node, path: TagPath) {
        let message = if node.children.is_empty() {
            format!("skipped unrecognized <{}>", node.name)
        } else {
            format!("skipped unrecognized <{}> and its {} children", node.name, node.children.len())
        };
        self.warnings.push(WarningKind::UnknownTag, path, message);
    }

    /// Reports children outside the vocabulary. Known children the mapper does
    /// not read are ignored silently.
    fn check_children(&mut self, node: &Node, path: &TagPath) {
        for child in &node.children {
            if !tags::is_known(&child.name) {
                self.unknown(child, path.child(&child.name));
            }
        }
    }

    fn signon(&mut self, node: &Node, path: &TagPath) {
        self.check_children(node, path);
        let Some(fi) = node.child("FI") else {
            return;
        };
        self.check_children(fi, &path.child("FI"));

        let institution = FinancialInstitution {
            organization: fi.text("ORG").map(str::to_string),
            fid: fi.text("FID").map(str::to_string),
        };
        if institution != FinancialInstitution::default() {
            self.institution = Some(institution);
        }
    }

    fn statement(&mut self, node: &Node, path: &TagPath, set: MessageSet) -> StatementResponse {
        self.check_children(node, path);

        let currency = self.currency(node, path);
        let account = self.account(node, path, set);

        let list_tag = set.transaction_list_tag();
        let list_path = path.child(list_tag);
        let list = node.child(list_tag);
        let (start_date, end_date) = match list {
            Some(list) => (
                self.date(list, "DTSTART", &list_path),
                self.date(list, "DTEND", &list_path),
            ),
            None => (None, None),
        };

        let transactions = match list {
            Some(list) => self.transactions(list, &list_path, set, &account.account_id),
            None => Vec::new(),
        };

        let (ledger_balance, available_balance) = match set {
            MessageSet::Bank | MessageSet::CreditCard => (
                self.balance(node, "LEDGERBAL", path),
                self.balance(node, "AVAILBAL", path),
            ),
            MessageSet::Investment => self.cash_balances(node, path),
        };

        StatementResponse {
            institution: None,
            account,
            currency,
            ledger_balance,
            available_balance,
            start_date,
            end_date,
            transactions,
        }
    }

    fn currency(&mut self, node: &Node, path: &TagPath) -> String {
        let fallback = self.options.fallback_currency.to_ascii_uppercase();
        let curdef_path = path.child("CURDEF");
        match node.text("CURDEF") {
            Some(raw) => normalize_currency(raw).unwrap_or_else(|| {
                self.warnings.push(
                    WarningKind::InvalidCurrency,
                    curdef_path,
                    format!("'{raw}' is not a currency code, using {fallback}"),
                );
                fallback
            }),
            None => {
                self.warnings.push(
                    WarningKind::MissingField,
                    curdef_path,
                    format!("no CURDEF, using {fallback}"),
                );
                fallback
            }
        }
    }

    fn account(&mut self, statement: &Node, path: &TagPath, set: MessageSet) -> AccountDescriptor {
        let tag = set.account_tag();
        let path = path.child(tag);
        let fixed_type = match set {
            MessageSet::Bank => None,
            MessageSet::CreditCard => Some(AccountType::CreditCard),
            MessageSet::Investment => Some(AccountType::Investment),
        };

        let Some(node) = statement.child(tag) else {
            self.warnings.push(WarningKind::MissingField, path, format!("no {tag} in statement"));
            return AccountDescriptor {
                account_id: String::new(),
                bank_id: None,
                branch_id: None,
                account_type: fixed_type.unwrap_or_default(),
            };
        };
        self.check_children(node, &path);

        let account_id = match node.text("ACCTID") {
            Some(id) => id.to_string(),
            None => {
                self.warnings.push(WarningKind::MissingField, path.child("ACCTID"), "no ACCTID");
                String::new()
            }
        };

        let (bank_id, branch_id) = match set {
            MessageSet::Bank => (node.text("BANKID"), node.text("BRANCHID")),
            MessageSet::CreditCard => (None, None),
            MessageSet::Investment => (node.text("BROKERID"), None),
        };

        let account_type = match fixed_type {
            Some(account_type) => account_type,
            None => self.bank_account_type(node, &path),
        };

        AccountDescriptor {
            account_id,
            bank_id: bank_id.map(str::to_string),
            branch_id: branch_id.map(str::to_string),
            account_type,
        }
    }

    fn bank_account_type(&mut self, node: &Node, path: &TagPath) -> AccountType {
        let path = path.child("ACCTTYPE");
        match node.text("ACCTTYPE") {
            Some(code) => AccountType::from_code(code).unwrap_or_else(|| {
                self.warnings.push(
                    WarningKind::UnknownAccountType,
                    path,
                    format!("unknown account type '{code}', using CHECKING"),
                );
                AccountType::default()
            }),
            None => {
                self.warnings.push(WarningKind::MissingField, path, "no ACCTTYPE, using CHECKING");
                AccountType::default()
            }
        }
    }

    fn transactions(&mut self, list: &Node, path: &TagPath, set: MessageSet, account_id: &str) -> Vec<Transaction> {
        self.check_children(list, path);

        let records: Vec<(&Node, TagPath)> = match set {
            MessageSet::Bank | MessageSet::CreditCard => list
                .children_named("STMTTRN")
                .map(|n| (n, path.child("STMTTRN")))
                .collect(),
            MessageSet::Investment => list
                .children_named("INVBANKTRAN")
                .filter_map(|wrapper| {
                    let wrapper_path = path.child("INVBANKTRAN");
                    self.check_children(wrapper, &wrapper_path);
                    wrapper.child("STMTTRN").map(|n| (n, wrapper_path.child("STMTTRN")))
                })
                .collect(),
        };

        records
            .into_iter()
            .enumerate()
            .filter_map(|(index, (node, txn_path))| self.transaction(node, &txn_path, account_id, index))
            .collect()
    }

    fn transaction(&mut self, node: &Node, path: &TagPath, account_id: &str, index: usize) -> Option<Transaction> {
        self.check_children(node, path);

        let amount = self.transaction_amount(node, path)?;
        let posted = match node.text("DTPOSTED") {
            Some(_) => self.date(node, "DTPOSTED", path),
            None => {
                self.warnings.push(WarningKind::MissingField, path.child("DTPOSTED"), "no DTPOSTED");
                None
            }
        };
        let user_date = self.date(node, "DTUSER", path);
        let transaction_type = self.transaction_type(node, path, amount);

        let (fitid, unstable_id) = match node.text("FITID") {
            Some(fitid) => (fitid.to_string(), false),
            None => {
                let key = synthesize_fitid(account_id, posted.as_ref(), amount, index);
                self.warnings.push(
                    WarningKind::MissingField,
                    path.child("FITID"),
                    format!("no FITID, using synthesized key {key}"),
                );
                (key, true)
            }
        };

        let name = node
            .text("NAME")
            .or_else(|| node.child("PAYEE").and_then(|payee| payee.text("NAME")));

        Some(Transaction {
            transaction_type,
            amount,
            posted,
            user_date,
            fitid,
            unstable_id,
            name: name.map(str::to_string),
            memo: node.text("MEMO").map(str::to_string),
            check_number: node.text("CHECKNUM").map(str::to_string),
        })
    }

    fn transaction_amount(&mut self, node: &Node, path: &TagPath) -> Option<Decimal> {
        let amount_path = path.child("TRNAMT");
        let Some(raw) = node.text("TRNAMT") else {
            self.warnings.push(WarningKind::MissingField, amount_path, "no TRNAMT, transaction skipped");
            return None;
        };
        match OfxAmount::from(raw).to_decimal() {
            Ok(amount) => Some(amount),
            Err(e) => {
                self.warnings
                    .push(WarningKind::InvalidAmount, amount_path, format!("{e}, transaction skipped"));
                None
            }
        }
    }

    fn transaction_type(&mut self, node: &Node, path: &TagPath, amount: Decimal) -> TransactionType {
        let type_path = path.child("TRNTYPE");
        match node.text("TRNTYPE") {
            Some(code) => TransactionType::from_code(code).unwrap_or_else(|| {
                self.warnings.push(
                    WarningKind::UnknownTransactionType,
                    type_path,
                    format!("unknown transaction type '{code}'"),
                );
                TransactionType::Other
            }),
            None => {
                let inferred = if amount.is_sign_negative() {
                    TransactionType::Debit
                } else {
                    TransactionType::Credit
                };
                self.warnings.push(
                    WarningKind::MissingField,
                    type_path,
                    format!("no TRNTYPE, inferred {} from amount sign", inferred.code()),
                );
                inferred
            }
        }
    }

    fn balance(&mut self, statement: &Node, tag: &str, path: &TagPath) -> Option<Balance> {
        let node = statement.child(tag)?;
        let path = path.child(tag);
        self.check_children(node, &path);

        let amount = self.amount(node, "BALAMT", &path)?;
        let as_of = self.date(node, "DTASOF", &path);
        Some(Balance { amount, as_of })
    }

    /// Investment statements carry cash in `INVBAL/AVAILCASH` and buying
    /// power in `INVBAL/BUYPOWER`, both dated by the statement's own `DTASOF`.
    /// Returned as (ledger, available).
    fn cash_balances(&mut self, statement: &Node, path: &TagPath) -> (Option<Balance>, Option<Balance>) {
        let Some(node) = statement.child("INVBAL") else {
            return (None, None);
        };
        let bal_path = path.child("INVBAL");
        self.check_children(node, &bal_path);

        // AVAILCASH may only be left out when BUYPOWER stands in for it
        let has_buying_power = node.text("BUYPOWER").is_some();
        let cash = if node.text("AVAILCASH").is_some() || !has_buying_power {
            self.amount(node, "AVAILCASH", &bal_path)
        } else {
            None
        };
        let buying_power = if has_buying_power {
            self.amount(node, "BUYPOWER", &bal_path)
        } else {
            None
        };

        let as_of = self.date(statement, "DTASOF", path);
        let dated = |amount| Balance { amount, as_of };
        (cash.map(dated), buying_power.map(dated))
    }

    fn amount(&mut self, node: &Node, tag: &str, path: &TagPath) -> Option<Decimal> {
        let field_path = path.child(tag);
        let Some(raw) = node.text(tag) else {
            self.warnings.push(WarningKind::MissingField, field_path, format!("no {tag}"));
            return None;
        };
        OfxAmount::from(raw)
            .to_decimal()
            .map_err(|e| self.warnings.push(WarningKind::InvalidAmount, field_path, e.to_string()))
            .ok()
    }

    /// Optional date field. Absent is fine; unparsable becomes a warning.
    fn date(&mut self, node: &Node, tag: &str, path: &TagPath) -> Option<DateTime<FixedOffset>> {
        let raw = node.text(tag)?;
        OfxDate::from(raw)
            .to_datetime(self.options.fallback_offset)
            .map_err(|e| self.warnings.push(WarningKind::InvalidDate, path.child(tag), e.to_string()))
            .ok()
    }
}

/// Deterministic stand-in for a missing FITID, readable enough to debug.
fn synthesize_fitid(
    account_id: &str,
    posted: Option<&DateTime<FixedOffset>>,
    amount: Decimal,
    index: usize,
) -> String {
    let date = posted.map_or_else(|| "nodate".to_string(), |d| d.format("%Y%m%d").to_string());
    format!("SYN:{account_id}:{date}:{}:{index}", amount.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::ofx::header::ParseMode;
    use crate::parsers::ofx::tokenizer::Tokenizer;
    use crate::parsers::ofx::tree::TreeBuilder;
    use rstest::rstest;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn map(body: &str) -> OfxResult<(Vec<StatementResponse>, Vec<crate::errors::ParseWarning>)> {
        let tokens = Tokenizer::new(body, 0, ParseMode::Sgml).tokenize()?;
        let (root, _) = TreeBuilder::new(ParseMode::Sgml).build(body, tokens)?;
        let options = ParseOptions::default();
        let (statements, warnings) = Mapper::new(&options).map(&root)?;
        Ok((statements, warnings.into_inner()))
    }

    fn kinds(warnings: &[crate::errors::ParseWarning]) -> Vec<WarningKind> {
        warnings.iter().map(|w| w.kind).collect()
    }

    const BANK: &str = "<OFX>
<SIGNONMSGSRSV1><SONRS><STATUS><CODE>0<SEVERITY>INFO</STATUS>
<DTSERVER>20250101<LANGUAGE>ENG<FI><ORG>Big Bank<FID>1234</FI></SONRS></SIGNONMSGSRSV1>
<BANKMSGSRSV1><STMTTRNRS><TRNUID>1<STMTRS>
<CURDEF>usd
<BANKACCTFROM><BANKID>021000021<ACCTID>555<ACCTTYPE>SAVINGS</BANKACCTFROM>
<BANKTRANLIST><DTSTART>20250101<DTEND>20250131
<STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20250105<TRNAMT>-12.50<FITID>A1<NAME>Coffee<MEMO>Latte</STMTTRN>
<STMTTRN><TRNTYPE>CHECK<DTPOSTED>20250106<TRNAMT>-100<FITID>A2<CHECKNUM>1001</STMTTRN>
</BANKTRANLIST>
<LEDGERBAL><BALAMT>1000.00<DTASOF>20250131</LEDGERBAL>
<AVAILBAL><BALAMT>900.00<DTASOF>20250131</AVAILBAL>
</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>";

    #[test]
    fn test_bank_statement_fields() {
        let (statements, warnings) = map(BANK).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        let st = &statements[0];

        assert_eq!(st.currency, "USD");
        assert_eq!(st.account.account_id, "555");
        assert_eq!(st.account.bank_id.as_deref(), Some("021000021"));
        assert_eq!(st.account.account_type, AccountType::Savings);
        assert_eq!(st.ledger_balance.as_ref().map(|b| b.amount), Some(dec("1000.00")));
        assert_eq!(st.available_balance.as_ref().map(|b| b.amount), Some(dec("900.00")));
        assert!(st.start_date.is_some() && st.end_date.is_some());

        let institution = st.institution.as_ref().unwrap();
        assert_eq!(institution.organization.as_deref(), Some("Big Bank"));
        assert_eq!(institution.fid.as_deref(), Some("1234"));

        assert_eq!(st.transactions.len(), 2);
        assert_eq!(st.transactions[0].name.as_deref(), Some("Coffee"));
        assert_eq!(st.transactions[0].memo.as_deref(), Some("Latte"));
        assert_eq!(st.transactions[1].transaction_type, TransactionType::Check);
        assert_eq!(st.transactions[1].check_number.as_deref(), Some("1001"));
    }

    #[test]
    fn test_credit_card_and_investment_statements() {
        let body = "<OFX>
<CREDITCARDMSGSRSV1><CCSTMTTRNRS><CCSTMTRS><CURDEF>EUR<CCACCTFROM><ACCTID>4111</CCACCTFROM>
<BANKTRANLIST><STMTTRN><TRNTYPE>POS<DTPOSTED>20250102<TRNAMT>-5<FITID>C1</STMTTRN></BANKTRANLIST>
<LEDGERBAL><BALAMT>-5<DTASOF>20250102</LEDGERBAL></CCSTMTRS></CCSTMTTRNRS></CREDITCARDMSGSRSV1>
<INVSTMTMSGSRSV1><INVSTMTTRNRS><INVSTMTRS><DTASOF>20250103<CURDEF>USD
<INVACCTFROM><BROKERID>broker.com<ACCTID>X9</INVACCTFROM>
<INVTRANLIST><INVBANKTRAN><STMTTRN><TRNTYPE>DIV<DTPOSTED>20250103<TRNAMT>3.10<FITID>I1</STMTTRN><SUBACCTFUND>CASH</INVBANKTRAN></INVTRANLIST>
<INVBAL><AVAILCASH>250.00<MARGINBALANCE>0<SHORTBALANCE>0<BUYPOWER>400.00</INVBAL>
</INVSTMTRS></INVSTMTTRNRS></INVSTMTMSGSRSV1></OFX>";
        let (statements, warnings) = map(body).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(statements.len(), 2);

        let cc = &statements[0];
        assert_eq!(cc.account.account_type, AccountType::CreditCard);
        assert_eq!(cc.currency, "EUR");
        assert_eq!(cc.transactions[0].transaction_type, TransactionType::Debit);

        let inv = &statements[1];
        assert_eq!(inv.account.account_type, AccountType::Investment);
        assert_eq!(inv.account.bank_id.as_deref(), Some("broker.com"));
        assert_eq!(inv.transactions[0].transaction_type, TransactionType::Interest);
        let cash = inv.ledger_balance.as_ref().unwrap();
        assert_eq!(cash.amount, dec("250.00"));
        assert!(cash.as_of.is_some());
        let buying_power = inv.available_balance.as_ref().unwrap();
        assert_eq!(buying_power.amount, dec("400.00"));
        assert_eq!(buying_power.as_of, cash.as_of);
    }

    #[test]
    fn test_no_statement_found() {
        let body = "<OFX><SIGNONMSGSRSV1><SONRS><STATUS><CODE>0</STATUS></SONRS></SIGNONMSGSRSV1></OFX>";
        assert_eq!(map(body).unwrap_err(), OfxError::NoStatementFound);
    }

    #[test]
    fn test_unknown_subtree_is_skipped_with_one_warning() {
        let body = "<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS><CURDEF>USD
<BANKACCTFROM><ACCTID>1<ACCTTYPE>CHECKING</BANKACCTFROM>
<XBANKEXT><A>1</A><B>2</B></XBANKEXT>
</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>";
        let (statements, warnings) = map(body).unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(kinds(&warnings), vec![WarningKind::UnknownTag]);
        assert_eq!(warnings[0].path.last(), Some("XBANKEXT"));
    }

    #[test]
    fn test_missing_fitid_is_synthesized_and_flagged() {
        let body = "<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS><CURDEF>USD
<BANKACCTFROM><ACCTID>77<ACCTTYPE>CHECKING</BANKACCTFROM>
<BANKTRANLIST><STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20250105<TRNAMT>-1.5</STMTTRN></BANKTRANLIST>
</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>";
        let (statements, warnings) = map(body).unwrap();
        let txn = &statements[0].transactions[0];
        assert!(txn.unstable_id);
        assert_eq!(txn.fitid, "SYN:77:20250105:-1.5:0");
        assert_eq!(kinds(&warnings), vec![WarningKind::MissingField]);
    }

    #[rstest]
    #[case("<TRNAMT>abc", WarningKind::InvalidAmount)]
    #[case("", WarningKind::MissingField)]
    fn test_transaction_without_usable_amount_is_skipped(#[case] amount: &str, #[case] kind: WarningKind) {
        let body = format!(
            "<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS><CURDEF>USD
<BANKACCTFROM><ACCTID>1<ACCTTYPE>CHECKING</BANKACCTFROM>
<BANKTRANLIST><STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20250105{amount}<FITID>F</STMTTRN></BANKTRANLIST>
</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>"
        );
        let (statements, warnings) = map(&body).unwrap();
        assert!(statements[0].transactions.is_empty());
        assert_eq!(kinds(&warnings), vec![kind]);
    }

    #[rstest]
    #[case("<CURDEF>Dollars", "USD", WarningKind::InvalidCurrency)]
    #[case("", "USD", WarningKind::MissingField)]
    fn test_currency_fallback(#[case] curdef: &str, #[case] expected: &str, #[case] kind: WarningKind) {
        let body = format!(
            "<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS>{curdef}
<BANKACCTFROM><ACCTID>1<ACCTTYPE>CHECKING</BANKACCTFROM>
</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>"
        );
        let (statements, warnings) = map(&body).unwrap();
        assert_eq!(statements[0].currency, expected);
        assert_eq!(kinds(&warnings), vec![kind]);
    }

    #[test]
    fn test_unknown_codes_fall_back_with_warnings() {
        let body = "<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS><CURDEF>USD
<BANKACCTFROM><ACCTID>1<ACCTTYPE>BROKERAGE</BANKACCTFROM>
<BANKTRANLIST><STMTTRN><TRNTYPE>WIRE<DTPOSTED>bad<TRNAMT>5<FITID>F</STMTTRN></BANKTRANLIST>
</STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>";
        let (statements, warnings) = map(body).unwrap();
        let st = &statements[0];
        assert_eq!(st.account.account_type, AccountType::Checking);
        assert_eq!(st.transactions[0].transaction_type, TransactionType::Other);
        assert_eq!(st.transactions[0].posted, None);
        assert_eq!(
            kinds(&warnings),
            vec![
                WarningKind::UnknownAccountType,
                WarningKind::InvalidDate,
                WarningKind::UnknownTransactionType,
            ]
        );
    }

    #[test]
    fn test_statement_found_without_ofx_wrapper() {
        let body = "<STMTRS><CURDEF>CAD<BANKACCTFROM><ACCTID>1<ACCTTYPE>CHECKING</BANKACCTFROM></STMTRS>";
        let (statements, _) = map(body).unwrap();
        assert_eq!(statements[0].currency, "CAD");
    }
}
