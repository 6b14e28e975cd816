//! Static OFX tag vocabulary.
//!
//! Roles decide implicit closing in SGML mode and leaf/container layout when
//! writing. Institution quirks are handled by adding names here; the parsing
//! code never special-cases a tag by name.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRole {
    /// Aggregate holding child elements, always closed explicitly.
    Container,
    /// Element carrying a single text value, never closed in SGML.
    Leaf,
}

const CONTAINER_TAGS: &[&str] = &[
    "OFX",
    // signon
    "SIGNONMSGSRSV1",
    "SONRS",
    "STATUS",
    "FI",
    // bank
    "BANKMSGSRSV1",
    "STMTTRNRS",
    "STMTRS",
    "BANKACCTFROM",
    "BANKACCTTO",
    "BANKTRANLIST",
    "STMTTRN",
    "LEDGERBAL",
    "AVAILBAL",
    "BALLIST",
    "BAL",
    "PAYEE",
    "CURRENCY",
    "ORIGCURRENCY",
    // credit card
    "CREDITCARDMSGSRSV1",
    "CCSTMTTRNRS",
    "CCSTMTRS",
    "CCACCTFROM",
    "CCACCTTO",
    // investment (banking part)
    "INVSTMTMSGSRSV1",
    "INVSTMTTRNRS",
    "INVSTMTRS",
    "INVACCTFROM",
    "INVTRANLIST",
    "INVBANKTRAN",
    "INVBAL",
];

const LEAF_TAGS: &[&str] = &[
    // status and signon
    "CODE",
    "SEVERITY",
    "MESSAGE",
    "DTSERVER",
    "USERKEY",
    "TSKEYEXPIRE",
    "LANGUAGE",
    "DTPROFUP",
    "DTACCTUP",
    "ORG",
    "FID",
    "SESSCOOKIE",
    "ACCESSKEY",
    "INTU.BID",
    "INTU.USERID",
    // transaction wrappers
    "TRNUID",
    "CLTCOOKIE",
    "CURDEF",
    "MKTGINFO",
    // accounts
    "BANKID",
    "BRANCHID",
    "ACCTID",
    "ACCTTYPE",
    "ACCTKEY",
    "BROKERID",
    // transaction list
    "DTSTART",
    "DTEND",
    "TRNTYPE",
    "DTPOSTED",
    "DTUSER",
    "DTAVAIL",
    "TRNAMT",
    "FITID",
    "CORRECTFITID",
    "CORRECTACTION",
    "SRVRTID",
    "CHECKNUM",
    "REFNUM",
    "SIC",
    "PAYEEID",
    "NAME",
    "EXTDNAME",
    "MEMO",
    "INV401KSOURCE",
    "SUBACCTFUND",
    "CURRATE",
    "CURSYM",
    // payee
    "ADDR1",
    "ADDR2",
    "ADDR3",
    "CITY",
    "STATE",
    "POSTALCODE",
    "COUNTRY",
    "PHONE",
    // balances
    "BALAMT",
    "DTASOF",
    "AVAILCASH",
    "MARGINBALANCE",
    "SHORTBALANCE",
    "BUYPOWER",
    "DESC",
    "BALTYPE",
    "VALUE",
];

/// Role of a known tag, or `None` for names outside the vocabulary.
pub fn role(name: &str) -> Option<TagRole> {
    if CONTAINER_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name)) {
        Some(TagRole::Container)
    } else if LEAF_TAGS.iter().any(|t| t.eq_ignore_ascii_case(name)) {
        Some(TagRole::Leaf)
    } else {
        None
    }
}

pub fn is_known(name: &str) -> bool {
    role(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("OFX", Some(TagRole::Container))]
    #[case("STMTTRN", Some(TagRole::Container))]
    #[case("banktranlist", Some(TagRole::Container))]
    #[case("TRNAMT", Some(TagRole::Leaf))]
    #[case("INTU.BID", Some(TagRole::Leaf))]
    #[case("fitid", Some(TagRole::Leaf))]
    #[case("XYZCUSTOM", None)]
    fn test_role(#[case] name: &str, #[case] expected: Option<TagRole>) {
        assert_eq!(role(name), expected);
    }

    #[test]
    fn test_tables_are_disjoint() {
        for tag in CONTAINER_TAGS {
            assert!(!LEAF_TAGS.contains(tag), "{tag} listed twice");
        }
    }
}
