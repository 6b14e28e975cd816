use super::header::ParseMode;
use super::tags::{self, TagRole};
use super::tokenizer::{SpannedToken, Token};
use crate::errors::{OfxError, OfxResult, Position, TagPath, WarningKind, Warnings};

/// Document tree node. A node with a value is a leaf and has no children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub value: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn container(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            children: Vec::new(),
        }
    }

    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    /// Builder-style child append, used when rendering records.
    pub fn with(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    /// Appends a leaf only when a value is present.
    pub fn with_opt(mut self, name: &str, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            self.children.push(Node::leaf(name, value));
        }
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.value.is_some()
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Trimmed, non-empty value of the first child leaf called `name`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .and_then(|c| c.value.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Follows a chain of child names.
    pub fn find(&self, path: &[&str]) -> Option<&Node> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }
}

/// Deepest nesting accepted below the root. Real statements stay far below it.
pub const MAX_DEPTH: usize = 256;

struct OpenNode {
    node: Node,
    /// Opened as a leaf without an inline value; closed by the next sibling.
    leaf: bool,
}

/// Turns the token stream into a tree with an explicit open-node stack.
pub struct TreeBuilder {
    mode: ParseMode,
    stack: Vec<OpenNode>,
    warnings: Warnings,
}

impl TreeBuilder {
    pub fn new(mode: ParseMode) -> Self {
        Self {
            mode,
            stack: vec![OpenNode {
                node: Node::container(""),
                leaf: false,
            }],
            warnings: Warnings::default(),
        }
    }

    /// Builds the tree under an unnamed root. Unclosed nodes are closed at end
    /// of input with a warning each. Only nesting beyond [`MAX_DEPTH`] fails;
    /// `src` is the content the token offsets refer to.
    pub(crate) fn build(mut self, src: &str, tokens: Vec<SpannedToken>) -> OfxResult<(Node, Warnings)> {
        for spanned in tokens {
            match spanned.token {
                Token::Open(name) => self.open(name),
                Token::Leaf { name, value, closed } => self.leaf(name, value, closed),
                Token::Close(name) => self.close(&name),
                Token::Text(text) => self.stray_text(&text),
            }
            if self.stack.len() > MAX_DEPTH + 1 {
                return Err(OfxError::MalformedInput {
                    message: format!("tags nested deeper than {MAX_DEPTH} levels"),
                    position: Some(Position::locate(src, spanned.offset)),
                    path: Some(self.path()),
                });
            }
        }

        self.unwind_above(0, WarningKind::UnclosedTag, "end of input");

        let root = self.stack.pop().map(|open| open.node).unwrap_or_else(|| Node::container(""));
        tracing::trace!(top_level = root.children.len(), "built OFX document tree");
        Ok((root, self.warnings))
    }

    fn top(&self) -> &OpenNode {
        &self.stack[self.stack.len() - 1]
    }

    fn path(&self) -> TagPath {
        self.stack.iter().skip(1).map(|open| open.node.name.as_str()).collect()
    }

    /// Stack index of the innermost open container called `name`.
    fn open_container(&self, name: &str) -> Option<usize> {
        self.stack
            .iter()
            .skip(1)
            .rposition(|open| !open.leaf && open.node.name == name)
            .map(|i| i + 1)
    }

    fn pop_into_parent(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(open) = self.stack.pop() {
            let parent = self.stack.len() - 1;
            self.stack[parent].node.children.push(open.node);
        }
    }

    /// Pops every node above stack index `index` into its parent. Containers
    /// are reported as `kind`, leaves as unclosed in XML and silently in SGML.
    fn unwind_above(&mut self, index: usize, kind: WarningKind, closed_by: &str) {
        let mut path = self.path();
        while self.stack.len() - 1 > index {
            let top = self.top();
            let (name, leaf) = (top.node.name.clone(), top.leaf);
            if !leaf {
                self.warnings
                    .push(kind, path.clone(), format!("<{name}> left open, closed by {closed_by}"));
            } else if self.mode == ParseMode::Xml {
                self.warnings
                    .push(WarningKind::UnclosedTag, path.clone(), format!("<{name}> closed implicitly"));
            }
            path.pop();
            self.pop_into_parent();
        }
    }

    /// Implicit close: a new sibling ends a leaf that was opened without a value.
    fn close_open_leaf(&mut self) {
        if self.stack.len() > 1 && self.top().leaf {
            if self.mode == ParseMode::Xml {
                let name = self.top().node.name.clone();
                self.warnings
                    .push(WarningKind::UnclosedTag, self.path(), format!("<{name}> closed implicitly"));
            }
            self.pop_into_parent();
        }
    }

    fn open(&mut self, name: String) {
        self.close_open_leaf();
        let leaf = tags::role(&name) == Some(TagRole::Leaf);
        if !leaf {
            // aggregates never nest inside themselves: a second <STMTTRN> ends the first
            if let Some(index) = self.open_container(&name) {
                self.unwind_above(index - 1, WarningKind::UnclosedTag, &format!("a new <{name}>"));
            }
        }
        let node = if leaf { Node::leaf(name, "") } else { Node::container(name) };
        self.stack.push(OpenNode { node, leaf });
    }

    fn leaf(&mut self, name: String, value: String, closed: bool) {
        self.close_open_leaf();

        if tags::role(&name) == Some(TagRole::Container) {
            self.warnings.push(
                WarningKind::StrayText,
                self.path().child(&name),
                format!("container <{name}> carries inline text '{value}'"),
            );
            self.stack.push(OpenNode {
                node: Node::container(name),
                leaf: false,
            });
            if closed {
                self.pop_into_parent();
            }
            return;
        }

        if self.mode == ParseMode::Xml && !closed {
            self.warnings.push(
                WarningKind::UnclosedTag,
                self.path().child(&name),
                format!("<{name}> has no closing tag"),
            );
        }
        let parent = self.stack.len() - 1;
        self.stack[parent].node.children.push(Node::leaf(name, value));
    }

    fn close(&mut self, name: &str) {
        let Some(index) = self.stack.iter().skip(1).rposition(|open| open.node.name == name).map(|i| i + 1) else {
            self.warnings.push(
                WarningKind::MismatchedCloseTag,
                self.path(),
                format!("</{name}> has no matching open tag and was discarded"),
            );
            return;
        };

        self.unwind_above(index, WarningKind::MismatchedCloseTag, &format!("</{name}>"));
        self.pop_into_parent();
    }

    fn stray_text(&mut self, text: &str) {
        if !text.is_empty() {
            self.warnings
                .push(WarningKind::StrayText, self.path(), format!("ignored text '{text}'"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::ofx::tokenizer::Tokenizer;

    fn build(src: &str, mode: ParseMode) -> (Node, Warnings) {
        let tokens = Tokenizer::new(src, 0, mode).tokenize().unwrap();
        TreeBuilder::new(mode).build(src, tokens).unwrap()
    }

    fn kinds(warnings: &Warnings) -> Vec<WarningKind> {
        warnings.as_slice().iter().map(|w| w.kind).collect()
    }

    #[test]
    fn test_sgml_implicit_leaf_closing() {
        let src = "<OFX><BANKMSGSRSV1><STMTTRNRS><STMTRS><CURDEF>USD<BANKTRANLIST><STMTTRN><TRNTYPE>DEBIT<DTPOSTED>20230110<TRNAMT>-42.50<FITID>1001</STMTTRN></BANKTRANLIST></STMTRS></STMTTRNRS></BANKMSGSRSV1></OFX>";
        let (root, warnings) = build(src, ParseMode::Sgml);

        assert!(warnings.as_slice().is_empty());
        let stmtrs = root.find(&["OFX", "BANKMSGSRSV1", "STMTTRNRS", "STMTRS"]).unwrap();
        assert_eq!(stmtrs.text("CURDEF"), Some("USD"));

        let trn = stmtrs.find(&["BANKTRANLIST", "STMTTRN"]).unwrap();
        assert_eq!(trn.children.len(), 4);
        assert_eq!(trn.text("TRNTYPE"), Some("DEBIT"));
        assert_eq!(trn.text("TRNAMT"), Some("-42.50"));
        assert_eq!(trn.text("FITID"), Some("1001"));
        assert!(trn.children.iter().all(Node::is_leaf));
    }

    #[test]
    fn test_sgml_empty_leaf_closed_by_sibling() {
        let (root, warnings) = build("<STMTTRN><MEMO>\n<NAME>Shop\n</STMTTRN>", ParseMode::Sgml);
        assert!(warnings.as_slice().is_empty());
        let trn = root.child("STMTTRN").unwrap();
        assert_eq!(trn.child("MEMO").unwrap().value.as_deref(), Some(""));
        assert_eq!(trn.text("MEMO"), None);
        assert_eq!(trn.text("NAME"), Some("Shop"));
    }

    #[test]
    fn test_xml_unclosed_leaf_warns_once() {
        let (root, warnings) = build("<STMTTRN><TRNAMT>-42.50<FITID>1001</FITID></STMTTRN>", ParseMode::Xml);
        assert_eq!(kinds(&warnings), vec![WarningKind::UnclosedTag]);
        assert_eq!(warnings.as_slice()[0].path.to_string(), "STMTTRN/TRNAMT");
        let trn = root.child("STMTTRN").unwrap();
        assert_eq!(trn.text("TRNAMT"), Some("-42.50"));
        assert_eq!(trn.text("FITID"), Some("1001"));
    }

    #[test]
    fn test_xml_empty_element() {
        let (root, warnings) = build("<STMTTRN><MEMO></MEMO><NAME>x</NAME></STMTTRN>", ParseMode::Xml);
        assert!(warnings.as_slice().is_empty());
        assert_eq!(root.child("STMTTRN").unwrap().children.len(), 2);
    }

    #[test]
    fn test_mismatched_close_recovers_to_ancestor() {
        let (root, warnings) = build("<OFX><BANKMSGSRSV1><STMTTRNRS></BANKMSGSRSV1></OFX>", ParseMode::Xml);
        assert_eq!(kinds(&warnings), vec![WarningKind::MismatchedCloseTag]);
        let bank = root.find(&["OFX", "BANKMSGSRSV1"]).unwrap();
        assert!(bank.child("STMTTRNRS").is_some());
    }

    #[test]
    fn test_unmatched_close_is_discarded() {
        let (root, warnings) = build("<OFX><STMTRS></STMTTRN></STMTRS></OFX>", ParseMode::Xml);
        assert_eq!(kinds(&warnings), vec![WarningKind::MismatchedCloseTag]);
        assert!(root.find(&["OFX", "STMTRS"]).is_some());
    }

    #[test]
    fn test_unclosed_at_end_of_input() {
        let (root, warnings) = build("<OFX><BANKMSGSRSV1><STMTTRNRS>", ParseMode::Sgml);
        assert_eq!(kinds(&warnings), vec![WarningKind::UnclosedTag; 3]);
        assert!(root.find(&["OFX", "BANKMSGSRSV1", "STMTTRNRS"]).is_some());
    }

    #[test]
    fn test_reopened_aggregate_closes_the_previous_one() {
        let src = "<BANKTRANLIST><STMTTRN><TRNTYPE>DEBIT<FITID>A\n<STMTTRN><TRNTYPE>CREDIT<FITID>B\n</STMTTRN></BANKTRANLIST>";
        let (root, warnings) = build(src, ParseMode::Sgml);

        assert_eq!(kinds(&warnings), vec![WarningKind::UnclosedTag]);
        assert_eq!(warnings.as_slice()[0].path.to_string(), "BANKTRANLIST/STMTTRN");

        let list = root.child("BANKTRANLIST").unwrap();
        let fitids: Vec<_> = list.children_named("STMTTRN").map(|t| t.text("FITID")).collect();
        assert_eq!(fitids, vec![Some("A"), Some("B")]);
    }

    fn nested(depth: usize) -> String {
        (0..depth).map(|i| format!("<X{i}>")).collect()
    }

    #[test]
    fn test_nesting_up_to_the_limit_is_accepted() {
        let (_, warnings) = build(&nested(MAX_DEPTH), ParseMode::Sgml);
        let warnings = warnings.as_slice();
        assert_eq!(warnings.len(), MAX_DEPTH);
        assert_eq!(warnings[0].path.last(), Some(format!("X{}", MAX_DEPTH - 1).as_str()));
        assert_eq!(warnings[MAX_DEPTH - 1].path.to_string(), "X0");
    }

    #[test]
    fn test_nesting_beyond_the_limit_is_rejected() {
        let src = nested(MAX_DEPTH * 1000);
        let tokens = Tokenizer::new(&src, 0, ParseMode::Sgml).tokenize().unwrap();
        match TreeBuilder::new(ParseMode::Sgml).build(&src, tokens) {
            Err(OfxError::MalformedInput { position: Some(pos), path: Some(path), .. }) => {
                assert_eq!(pos.line, 1);
                assert_eq!(path.last(), Some(format!("X{MAX_DEPTH}").as_str()));
            }
            other => panic!("expected MalformedInput, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag_with_value_is_leaf() {
        let (root, _) = build("<STMTTRN><XBANKNOTE>hello<TRNAMT>1</STMTTRN>", ParseMode::Sgml);
        let trn = root.child("STMTTRN").unwrap();
        assert_eq!(trn.text("XBANKNOTE"), Some("hello"));
        assert_eq!(trn.text("TRNAMT"), Some("1"));
    }

    #[test]
    fn test_unknown_tag_without_value_is_container() {
        let (root, warnings) = build("<OFX><XEXT><CODE>1</XEXT></OFX>", ParseMode::Sgml);
        assert!(warnings.as_slice().is_empty());
        assert_eq!(root.find(&["OFX", "XEXT"]).unwrap().text("CODE"), Some("1"));
    }

    #[test]
    fn test_stray_text_warns() {
        let (_, warnings) = build("<OFX>junk<CODE>0</OFX>", ParseMode::Xml);
        assert!(kinds(&warnings).contains(&WarningKind::StrayText));
    }

    #[test]
    fn test_node_helpers() {
        let node = Node::container("STMTTRN")
            .with(Node::leaf("NAME", "  Shop  "))
            .with_opt("MEMO", None::<String>)
            .with_opt("FITID", Some("1"));
        assert_eq!(node.children.len(), 2);
        assert_eq!(node.text("NAME"), Some("Shop"));
        assert_eq!(node.children_named("FITID").count(), 1);
        assert!(node.find(&[]).is_some());
    }
}
