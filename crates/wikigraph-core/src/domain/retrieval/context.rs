//! Context assembly
//!
//! Splits resolved nodes into a text payload and a list of image references
//! for the answer-generation collaborator. No truncation happens here.

use crate::domain::graph::Node;
use crate::domain::vector::Modality;

/// Text and image context ready for prompting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledContext {
    /// Bodies of text-bearing nodes, single-space separated
    pub text: String,
    /// Media references of image and plot nodes, single-space separated
    pub image_refs: String,
}

impl AssembledContext {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.image_refs.is_empty()
    }

    /// Render the answer-generation prompt for a question
    pub fn answer_prompt(&self, question: &str) -> String {
        format!(
            "You are provided with context information retrieved from various sources. \
             Please use this information to answer the following question thoroughly and concisely.\n\n\
             Context (Textual Information):\n{}\n\
             \nRelevant Images (URLs) (if applicable):\n{}\n\
             \nInstructions:\n\
             - Base your answer primarily on the textual context provided.\n\
             - Use relevant details from the images only if they add value to the answer.\n\
             - Structure your response using headings and bullet points for clarity.\n\
             - Avoid repeating information.\n\
             - Ensure the answer is informative and directly addresses the question.\n\
             - If no context was provided, please state that the context wasn't provided to answer the question.\n\n\
             Question: {}\n\
             Answer:",
            self.text, self.image_refs, question
        )
    }
}

/// Partition nodes into text and image context, preserving order
pub fn assemble(nodes: &[Node]) -> AssembledContext {
    let mut text = Vec::new();
    let mut images = Vec::new();

    for node in nodes {
        match node.modality() {
            Modality::Text if !node.body.trim().is_empty() => text.push(node.body.as_str()),
            Modality::Image => {
                if let Some(media) = node.media.as_deref().filter(|m| !m.is_empty()) {
                    images.push(media);
                }
            }
            _ => {}
        }
    }

    AssembledContext {
        text: text.join(" "),
        image_refs: images.join(" "),
    }
}
