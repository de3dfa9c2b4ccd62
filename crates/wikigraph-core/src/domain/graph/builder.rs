//! Page graph builder
//!
//! Shapes the nodes extracted from one encyclopedia page into a batch that
//! satisfies the structural invariants: every non-page node gets exactly one
//! PARENT and one SOURCE edge, and NEXT/PREVIOUS edges only join nodes added
//! consecutively to the same run.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};

use super::node::{Node, NodeKind};
use super::relationship::RelationshipKind;

const SECTION_RUN: &str = "section";
const IMAGE_RUN: &str = "image";
const TABLE_RUN: &str = "table";
const CITATION_RUN: &str = "citation";
const REFERENCE_RUN: &str = "wiki-ref";

/// Incrementally builds the node batch for one page
#[derive(Debug)]
pub struct PageGraphBuilder {
    page: Node,
    summary: Option<String>,
    nodes: Vec<Node>,
    /// logical_id -> position in `nodes`
    index: HashMap<String, usize>,
    /// section or subsection title -> owning section's logical_id
    sections_by_title: HashMap<String, String>,
    /// run key -> logical_id of the last node added to the run
    runs: HashMap<String, String>,
}

impl PageGraphBuilder {
    /// Start a batch from the page itself
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            page: Node::new(NodeKind::Page, title).with_body(body),
            summary: None,
            nodes: Vec::new(),
            index: HashMap::new(),
            sections_by_title: HashMap::new(),
            runs: HashMap::new(),
        }
    }

    /// Set the page summary inherited by every node as context
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Logical ID of the page node
    pub fn page_id(&self) -> &str {
        &self.page.logical_id
    }

    /// Look up a node added so far
    pub fn get(&self, logical_id: &str) -> Option<&Node> {
        if logical_id == self.page.logical_id {
            return Some(&self.page);
        }
        self.index.get(logical_id).map(|&i| &self.nodes[i])
    }

    /// Add a top-level section
    pub fn add_section(&mut self, title: impl Into<String>, body: impl Into<String>) -> String {
        let title = title.into();
        let node = Node::new(NodeKind::Section, title.clone()).with_body(body);
        let id = self.push_child(node, self.page.logical_id.clone(), Some(SECTION_RUN.to_string()));
        self.sections_by_title.insert(title, id.clone());
        id
    }

    /// Add a subsection under an existing section
    ///
    /// Subsections are chained per section, so the run restarts under each new section.
    pub fn add_subsection(
        &mut self,
        section_id: &str,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<String> {
        self.require_kind(section_id, &[NodeKind::Section])?;
        let title = title.into();
        let node = Node::new(NodeKind::Subsection, title.clone()).with_body(body);
        let id = self.push_child(node, section_id.to_string(), Some(format!("subsection:{section_id}")));
        self.sections_by_title.insert(title, section_id.to_string());
        Ok(id)
    }

    /// Add an image or plot hanging off the page
    pub fn add_image(
        &mut self,
        title: impl Into<String>,
        url: impl Into<String>,
        kind: NodeKind,
    ) -> Result<String> {
        if !matches!(kind, NodeKind::Image | NodeKind::Plot) {
            return Err(Error::InvalidInput(format!("{kind} is not an image kind")));
        }
        let node = Node::new(kind, title).with_media(url);
        Ok(self.push_child(node, self.page.logical_id.clone(), Some(IMAGE_RUN.to_string())))
    }

    /// Add a table serialized as CSV
    pub fn add_table(&mut self, title: impl Into<String>, csv: impl Into<String>) -> String {
        let node = Node::new(NodeKind::Table, title).with_body(csv);
        self.push_child(node, self.page.logical_id.clone(), Some(TABLE_RUN.to_string()))
    }

    /// Add a citation link under the section it was cited in
    ///
    /// Falls back to the page when the section title is unknown.
    pub fn add_citation(
        &mut self,
        section_title: Option<&str>,
        title: impl Into<String>,
        url: impl Into<String>,
        archived: bool,
    ) -> String {
        let kind = if archived {
            NodeKind::ArchiveCitation
        } else {
            NodeKind::Citation
        };
        let node = Node::new(kind, title).with_body(url);
        let parent = self.section_or_page(section_title);
        self.push_child(node, parent, Some(CITATION_RUN.to_string()))
    }

    /// Add a link to another encyclopedia page
    pub fn add_wiki_reference(
        &mut self,
        section_title: Option<&str>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> String {
        let node = Node::new(NodeKind::WikiReference, title).with_body(url);
        let parent = self.section_or_page(section_title);
        self.push_child(node, parent, Some(REFERENCE_RUN.to_string()))
    }

    /// Add one chunk of a section or subsection
    pub fn add_chunk(
        &mut self,
        parent_id: &str,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<String> {
        self.require_kind(parent_id, &[NodeKind::Section, NodeKind::Subsection])?;
        let node = Node::new(NodeKind::Chunk, title).with_body(body);
        Ok(self.push_child(node, parent_id.to_string(), None))
    }

    /// Split-and-add helper: chunks are titled `<parent title>_chunk_<n>`
    pub fn add_chunks<I, S>(&mut self, parent_id: &str, bodies: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let parent_title = self
            .get(parent_id)
            .map(|n| n.title.clone())
            .ok_or_else(|| Error::InvalidInput(format!("unknown parent {parent_id}")))?;

        bodies
            .into_iter()
            .enumerate()
            .map(|(idx, body)| self.add_chunk(parent_id, format!("{parent_title}_chunk_{idx}"), body))
            .collect()
    }

    /// Add a node derived by a language-model transformation of `parent_id`
    pub fn add_derived(
        &mut self,
        parent_id: &str,
        kind: NodeKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<String> {
        let allowed_parents: &[NodeKind] = match kind {
            NodeKind::Entities | NodeKind::Summary | NodeKind::KeyTakeaways => {
                &[NodeKind::Section, NodeKind::Subsection]
            }
            NodeKind::ImageDescription | NodeKind::ImageEntities => &[NodeKind::Image],
            NodeKind::PlotInsights => &[NodeKind::Plot],
            NodeKind::TableAnalysis => &[NodeKind::Table],
            other => {
                return Err(Error::InvalidInput(format!("{other} is not a derived kind")));
            }
        };
        self.require_kind(parent_id, allowed_parents)?;
        let node = Node::new(kind, title).with_body(body);
        Ok(self.push_child(node, parent_id.to_string(), None))
    }

    /// Finish the batch: apply the embedding policy and inherit page context
    ///
    /// The page comes first so that it is persisted before its dependants.
    pub fn build(self) -> Vec<Node> {
        let mut page = self.page;
        page.context = self.summary.clone();
        page.needs_embedding = NodeKind::Page.default_needs_embedding();

        let mut nodes = Vec::with_capacity(self.nodes.len() + 1);
        nodes.push(page);

        for mut node in self.nodes {
            node.needs_embedding = node.kind.default_needs_embedding();
            if node.context.is_none() {
                node.context = self.summary.clone();
            }
            nodes.push(node);
        }

        debug!(nodes = nodes.len(), "Page graph built");
        nodes
    }

    fn push_child(&mut self, mut node: Node, parent_id: String, run: Option<String>) -> String {
        let id = node.logical_id.clone();
        node.link(parent_id, RelationshipKind::Parent);
        node.link(self.page.logical_id.clone(), RelationshipKind::Source);

        if let Some(run) = run {
            if let Some(prev_id) = self.runs.get(&run).cloned()
                && let Some(&prev_idx) = self.index.get(&prev_id)
            {
                self.nodes[prev_idx].link(id.clone(), RelationshipKind::Next);
                node.link(prev_id, RelationshipKind::Previous);
            }
            self.runs.insert(run, id.clone());
        }

        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn section_or_page(&self, section_title: Option<&str>) -> String {
        section_title
            .and_then(|t| self.sections_by_title.get(t))
            .cloned()
            .unwrap_or_else(|| self.page.logical_id.clone())
    }

    fn require_kind(&self, logical_id: &str, kinds: &[NodeKind]) -> Result<()> {
        match self.get(logical_id) {
            Some(node) if kinds.contains(&node.kind) => Ok(()),
            Some(node) => Err(Error::InvalidInput(format!(
                "{} node {} cannot be a parent here",
                node.kind, logical_id
            ))),
            None => Err(Error::InvalidInput(format!("unknown parent {logical_id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(node: &Node, kind: RelationshipKind) -> Vec<String> {
        node.relationships_of(kind).map(|r| r.to_id.clone()).collect()
    }

    #[test]
    fn test_every_node_is_structurally_valid() {
        let mut builder = PageGraphBuilder::new("Squirrel", "Squirrels are rodents.")
            .with_summary("Small rodents");
        let diet = builder.add_section("Diet", "Nuts and seeds");
        let sub = builder.add_subsection(&diet, "Caching", "They bury food").unwrap();
        builder.add_chunks(&sub, ["They bury", "food"]).unwrap();
        let img = builder
            .add_image("squirrel.jpg", "https://example.org/squirrel.jpg", NodeKind::Image)
            .unwrap();
        builder
            .add_derived(&img, NodeKind::ImageDescription, "desc", "A red squirrel")
            .unwrap();
        builder.add_citation(Some("Diet"), "Smith 2001", "https://example.org/smith", false);
        builder.add_wiki_reference(None, "Rodent", "https://en.wikipedia.org/wiki/Rodent");

        let nodes = builder.build();
        assert_eq!(nodes[0].kind, NodeKind::Page);
        for node in &nodes {
            node.validate_structure().unwrap();
        }
    }

    #[test]
    fn test_section_chain_and_subsection_reset() {
        let mut builder = PageGraphBuilder::new("P", "");
        let s1 = builder.add_section("A", "a");
        let a1 = builder.add_subsection(&s1, "A.1", "x").unwrap();
        let s2 = builder.add_section("B", "b");
        let b1 = builder.add_subsection(&s2, "B.1", "y").unwrap();

        let nodes = builder.build();
        let find = |id: &str| nodes.iter().find(|n| n.logical_id == id).unwrap();

        assert_eq!(targets(find(&s1), RelationshipKind::Next), vec![s2.clone()]);
        assert_eq!(targets(find(&s2), RelationshipKind::Previous), vec![s1.clone()]);
        // B.1 starts a fresh run under B
        assert!(targets(find(&b1), RelationshipKind::Previous).is_empty());
        assert!(targets(find(&a1), RelationshipKind::Next).is_empty());
    }

    #[test]
    fn test_runs_never_cross_modality() {
        let mut builder = PageGraphBuilder::new("P", "");
        let s = builder.add_section("A", "a");
        let i = builder.add_image("img", "u", NodeKind::Image).unwrap();
        let p = builder.add_image("plot", "v", NodeKind::Plot).unwrap();

        let nodes = builder.build();
        let find = |id: &str| nodes.iter().find(|n| n.logical_id == id).unwrap();

        assert!(targets(find(&s), RelationshipKind::Next).is_empty());
        assert_eq!(targets(find(&i), RelationshipKind::Next), vec![p.clone()]);
        assert_eq!(targets(find(&p), RelationshipKind::Previous), vec![i]);
    }

    #[test]
    fn test_chunk_and_derived_parents() {
        let mut builder = PageGraphBuilder::new("P", "");
        let page_id = builder.page_id().to_string();
        let s = builder.add_section("A", "a");
        let chunks = builder.add_chunks(&s, ["one", "two"]).unwrap();
        let table = builder.add_table("P_table_0", "a,b\n1,2");

        assert!(builder.add_chunk(&table, "bad", "x").is_err());
        assert!(builder.add_derived(&s, NodeKind::PlotInsights, "x", "y").is_err());
        assert!(builder.add_derived(&s, NodeKind::Chunk, "x", "y").is_err());
        builder
            .add_derived(&table, NodeKind::TableAnalysis, "analysis", "trend")
            .unwrap();

        let nodes = builder.build();
        let first = nodes.iter().find(|n| n.logical_id == chunks[0]).unwrap();
        assert_eq!(first.title, "A_chunk_0");
        assert_eq!(first.parent_id(), Some(s.as_str()));
        assert_eq!(first.source_id(), Some(page_id.as_str()));
    }

    #[test]
    fn test_build_applies_policy_and_context() {
        let mut builder = PageGraphBuilder::new("P", "body").with_summary("sum");
        let s = builder.add_section("A", "a");
        builder.add_chunk(&s, "c", "text").unwrap();
        builder.add_citation(Some("Missing"), "cite", "https://x", true);

        let nodes = builder.build();
        for node in &nodes {
            assert_eq!(node.needs_embedding, node.kind.default_needs_embedding());
            assert_eq!(node.context.as_deref(), Some("sum"));
        }

        let archived = nodes
            .iter()
            .find(|n| n.kind == NodeKind::ArchiveCitation)
            .unwrap();
        assert_eq!(archived.parent_id(), Some(nodes[0].logical_id.as_str()));
    }
}
