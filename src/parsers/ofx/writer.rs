use chrono::{DateTime, FixedOffset, Utc};
use encoding_rs::{UTF_8, WINDOWS_1252};

use super::header::ParseMode;
use super::tags::{self, TagRole};
use super::tree::Node;
use super::types::{OfxAmount, OfxDate};
use crate::builder::SerializeOptions;
use crate::parsers::traits::Writer;
use crate::types::{AccountType, Balance, StatementResponse, Transaction};

const INDENT: &str = "  ";

/// Renders statements as an OFX document in the configured version.
pub struct OfxWriter;

impl Writer for OfxWriter {
    type Input = [StatementResponse];

    fn write(statements: &[StatementResponse], options: &SerializeOptions) -> String {
        let mode = options.version.mode();
        let document = document(statements, options);

        let mut out = header(options);
        render(&document, mode, 0, &mut out);
        tracing::debug!(
            version = %options.version,
            statements = statements.len(),
            bytes = out.len(),
            "serialized OFX document"
        );
        out
    }
}

impl OfxWriter {
    /// Serializes and encodes in one step. Characters the target encoding
    /// cannot represent become numeric character references.
    pub fn write_bytes(statements: &[StatementResponse], options: &SerializeOptions) -> Vec<u8> {
        let text = Self::write(statements, options);
        let (bytes, _, _) = options.encoding.encode(&text);
        bytes.into_owned()
    }
}

fn header(options: &SerializeOptions) -> String {
    let code = options.version.header_code();
    // encoding_rs writes UTF-16 and replacement encodings as UTF-8
    let output = options.encoding.output_encoding();
    match options.version.mode() {
        ParseMode::Sgml => {
            let (encoding, charset) = if output == UTF_8 {
                ("UTF-8", "NONE")
            } else if output == WINDOWS_1252 {
                ("USASCII", "1252")
            } else {
                ("USASCII", output.name())
            };
            [
                "OFXHEADER:100".to_string(),
                "DATA:OFXSGML".to_string(),
                format!("VERSION:{code}"),
                "SECURITY:NONE".to_string(),
                format!("ENCODING:{encoding}"),
                format!("CHARSET:{charset}"),
                "COMPRESSION:NONE".to_string(),
                "OLDFILEUID:NONE".to_string(),
                "NEWFILEUID:NONE".to_string(),
                String::new(),
                String::new(),
            ]
            .join("\n")
        }
        ParseMode::Xml => format!(
            "<?xml version=\"1.0\" encoding=\"{}\" standalone=\"no\"?>\n\
             <?OFX OFXHEADER=\"200\" VERSION=\"{code}\" SECURITY=\"NONE\" OLDFILEUID=\"NONE\" NEWFILEUID=\"NONE\"?>\n",
            output.name()
        ),
    }
}

fn document(statements: &[StatementResponse], options: &SerializeOptions) -> Node {
    let mut ofx = Node::container("OFX").with(signon(statements, options));

    // Consecutive statements of the same kind share one message set wrapper,
    // so the document order matches the input order.
    let mut runs: Vec<(&'static str, Node)> = Vec::new();
    for (index, statement) in statements.iter().enumerate() {
        let (wrapper, response) = statement_response(statement, index + 1);
        match runs.last_mut() {
            Some((name, node)) if *name == wrapper => node.children.push(response),
            _ => runs.push((wrapper, Node::container(wrapper).with(response))),
        }
    }
    for (_, node) in runs {
        ofx = ofx.with(node);
    }
    ofx
}

fn status() -> Node {
    Node::container("STATUS")
        .with(Node::leaf("CODE", "0"))
        .with(Node::leaf("SEVERITY", "INFO"))
}

fn signon(statements: &[StatementResponse], options: &SerializeOptions) -> Node {
    let mut sonrs = Node::container("SONRS")
        .with(status())
        .with(Node::leaf("DTSERVER", date(&server_time(statements, options))))
        .with(Node::leaf("LANGUAGE", "ENG"));

    // SONRS is per document, so only one institution can be written
    let institution = statements.iter().find_map(|s| s.institution.as_ref());
    if statements.iter().filter_map(|s| s.institution.as_ref()).any(|fi| Some(fi) != institution) {
        tracing::warn!("statements name different institutions, only the first is written");
    }
    if let Some(fi) = institution.filter(|fi| fi.organization.is_some() || fi.fid.is_some()) {
        sonrs = sonrs.with(
            Node::container("FI")
                .with_opt("ORG", fi.organization.as_deref())
                .with_opt("FID", fi.fid.as_deref()),
        );
    }
    Node::container("SIGNONMSGSRSV1").with(sonrs)
}

/// Configured time, else the latest date in the data, else the epoch. Never
/// the wall clock, so output is reproducible.
fn server_time(statements: &[StatementResponse], options: &SerializeOptions) -> DateTime<FixedOffset> {
    if let Some(time) = options.server_time {
        return time;
    }
    statements
        .iter()
        .flat_map(|s| {
            let balances = [&s.ledger_balance, &s.available_balance]
                .into_iter()
                .filter_map(|b| b.as_ref().and_then(|b| b.as_of));
            let transactions = s.transactions.iter().flat_map(|t| [t.posted, t.user_date]).flatten();
            [s.start_date, s.end_date].into_iter().flatten().chain(balances).chain(transactions)
        })
        .max()
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.fixed_offset())
}

/// Returns the message set wrapper name and the transaction response node.
fn statement_response(statement: &StatementResponse, trnuid: usize) -> (&'static str, Node) {
    let (wrapper, trnrs, body) = match statement.account.account_type {
        AccountType::CreditCard => ("CREDITCARDMSGSRSV1", "CCSTMTTRNRS", credit_card_statement(statement)),
        AccountType::Investment => ("INVSTMTMSGSRSV1", "INVSTMTTRNRS", investment_statement(statement)),
        _ => ("BANKMSGSRSV1", "STMTTRNRS", bank_statement(statement)),
    };
    let response = Node::container(trnrs)
        .with(Node::leaf("TRNUID", trnuid.to_string()))
        .with(status())
        .with(body);
    (wrapper, response)
}

fn bank_statement(statement: &StatementResponse) -> Node {
    let account = &statement.account;
    let account_node = Node::container("BANKACCTFROM")
        .with_opt("BANKID", account.bank_id.as_deref())
        .with_opt("BRANCHID", account.branch_id.as_deref())
        .with(Node::leaf("ACCTID", account.account_id.as_str()))
        .with_opt("ACCTTYPE", account.account_type.code());

    let node = Node::container("STMTRS")
        .with(Node::leaf("CURDEF", statement.currency.as_str()))
        .with(account_node)
        .with(transaction_list("BANKTRANLIST", statement, stmttrn));
    with_balances(node, statement)
}

fn credit_card_statement(statement: &StatementResponse) -> Node {
    let node = Node::container("CCSTMTRS")
        .with(Node::leaf("CURDEF", statement.currency.as_str()))
        .with(Node::container("CCACCTFROM").with(Node::leaf("ACCTID", statement.account.account_id.as_str())))
        .with(transaction_list("BANKTRANLIST", statement, stmttrn));
    with_balances(node, statement)
}

fn investment_statement(statement: &StatementResponse) -> Node {
    let account = &statement.account;
    let (cash, buying_power) = (&statement.ledger_balance, &statement.available_balance);
    // INVBAL has no dates of its own, both balances share the statement DTASOF
    let as_of = [cash, buying_power].into_iter().flatten().find_map(|b| b.as_of);

    let mut node = Node::container("INVSTMTRS")
        .with_opt("DTASOF", as_of.as_ref().map(date))
        .with(Node::leaf("CURDEF", statement.currency.as_str()))
        .with(
            Node::container("INVACCTFROM")
                .with_opt("BROKERID", account.bank_id.as_deref())
                .with(Node::leaf("ACCTID", account.account_id.as_str())),
        )
        .with(transaction_list("INVTRANLIST", statement, |txn| {
            Node::container("INVBANKTRAN")
                .with(stmttrn(txn))
                .with(Node::leaf("SUBACCTFUND", "CASH"))
        }));

    if cash.is_some() || buying_power.is_some() {
        node = node.with(
            Node::container("INVBAL")
                .with_opt("AVAILCASH", cash.as_ref().map(amount))
                .with(Node::leaf("MARGINBALANCE", "0.00"))
                .with(Node::leaf("SHORTBALANCE", "0.00"))
                .with_opt("BUYPOWER", buying_power.as_ref().map(amount)),
        );
    }
    node
}

fn transaction_list(name: &str, statement: &StatementResponse, record: impl Fn(&Transaction) -> Node) -> Node {
    let list = Node::container(name)
        .with_opt("DTSTART", statement.start_date.as_ref().map(date))
        .with_opt("DTEND", statement.end_date.as_ref().map(date));
    statement
        .transactions
        .iter()
        .fold(list, |list, txn| list.with(record(txn)))
}

fn stmttrn(txn: &Transaction) -> Node {
    Node::container("STMTTRN")
        .with(Node::leaf("TRNTYPE", txn.transaction_type.code()))
        .with_opt("DTPOSTED", txn.posted.as_ref().map(date))
        .with_opt("DTUSER", txn.user_date.as_ref().map(date))
        .with(Node::leaf("TRNAMT", OfxAmount::from_decimal(txn.amount).to_string()))
        .with(Node::leaf("FITID", txn.fitid.as_str()))
        .with_opt("CHECKNUM", txn.check_number.as_deref())
        .with_opt("NAME", txn.name.as_deref())
        .with_opt("MEMO", txn.memo.as_deref())
}

fn with_balances(mut node: Node, statement: &StatementResponse) -> Node {
    for (name, balance) in [
        ("LEDGERBAL", &statement.ledger_balance),
        ("AVAILBAL", &statement.available_balance),
    ] {
        if let Some(balance) = balance {
            node = node.with(
                Node::container(name)
                    .with(Node::leaf("BALAMT", amount(balance)))
                    .with_opt("DTASOF", balance.as_of.as_ref().map(date)),
            );
        }
    }
    node
}

fn date(value: &DateTime<FixedOffset>) -> String {
    OfxDate::from_datetime(value).to_string()
}

fn amount(balance: &Balance) -> String {
    OfxAmount::from_decimal(balance.amount).to_string()
}

fn render(node: &Node, mode: ParseMode, depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    let is_leaf = match tags::role(&node.name) {
        Some(TagRole::Leaf) => true,
        Some(TagRole::Container) => false,
        None => node.is_leaf(),
    };

    if is_leaf {
        let value = escape(node.value.as_deref().unwrap_or_default(), mode);
        match mode {
            ParseMode::Sgml => out.push_str(&format!("{indent}<{}>{value}\n", node.name)),
            ParseMode::Xml => out.push_str(&format!("{indent}<{0}>{value}</{0}>\n", node.name)),
        }
        return;
    }

    out.push_str(&format!("{indent}<{}>\n", node.name));
    for child in &node.children {
        render(child, mode, depth + 1, out);
    }
    out.push_str(&format!("{indent}</{}>\n", node.name));
}

/// Escapes markup characters. SGML values end at the line break, so embedded
/// line breaks are flattened to spaces there.
fn escape(value: &str, mode: ParseMode) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' | '\n' if mode == ParseMode::Sgml => out.push(' '),
            c => out.push(c),
        }
    }
    out
}
